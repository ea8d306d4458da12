//! ロギングの初期化
//!
//! - コンソール（stderr）への出力: `text` または `json`
//! - `directory` を指定した場合は日次ローテーションのファイルにも JSON で出力
//! - レベルは `RUST_LOG` が設定されていればそちらを優先
//!
//! 返される [`LoggingGuard`] を保持している間だけファイル出力が有効です。

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::{Layer, fmt};

use crate::config::settings::{LogFormat, LoggingSettings};
use crate::error::ConfigError;

const LOG_FILE_PREFIX: &str = "legal-workflow.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// ファイル出力のバッファをフラッシュするためのガード
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// グローバルな tracing サブスクライバーを設定する
pub fn init(settings: &LoggingSettings) -> Result<LoggingGuard, ConfigError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| level_filter(&settings.level))?;

    let mut layers: Vec<BoxedLayer> = vec![console_layer(settings.format)];

    let file_guard = match &settings.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn console_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Text => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    }
}

fn level_filter(level: &str) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_new(level)
        .map_err(|e| ConfigError::Logging(format!("ログレベル '{}' が不正です: {}", level, e)))
}
