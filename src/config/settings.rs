//! アプリケーション設定
//!
//! # 責務
//!
//! - 設定ファイル（TOML）の読み込み
//! - ペルソナ（リスクプロファイル・トーン）、エンジン、プロバイダー、ロギングの設定
//! - 全項目にデフォルト値を持たせ、設定ファイルなしでも動作させる
//!
//! # 設定例
//!
//! ```toml
//! [persona]
//! risk_profile = "high"
//! tone = "formal"
//!
//! [engine]
//! auto_advance_delay_ms = 1000
//! max_tokens = 2000
//!
//! [provider]
//! kind = "anthropic"
//! model = "claude-sonnet-4-5"
//! retry_count = 2
//! timeout_secs = 120
//!
//! [logging]
//! level = "info"
//! format = "json"
//! directory = "logs"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// リスク許容度
///
/// プロンプトの注意書きとサンプリング温度の選択に使用します。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Low,
    #[default]
    Medium,
    High,
}

/// プロンプト調整に使用するペルソナ設定
///
/// エンジン生成時に明示的に渡します（グローバル状態は持ちません）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptProfile {
    pub risk_profile: RiskProfile,
    /// 回答のトーン（例: "formal", "plain-language"）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

impl PromptProfile {
    pub fn new(risk_profile: RiskProfile) -> Self {
        Self {
            risk_profile,
            tone: None,
        }
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }
}

/// エンジンの動作設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// ステップ完了から次のステップへ自動で進むまでの待機時間（ミリ秒）
    pub auto_advance_delay_ms: u64,
    /// CompletionService に渡す最大トークン数
    pub max_tokens: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            auto_advance_delay_ms: 1000,
            max_tokens: 2000,
        }
    }
}

impl EngineSettings {
    pub fn auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.auto_advance_delay_ms)
    }
}

/// AI プロバイダー
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
    Gemini,
}

/// プロバイダー接続設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    /// 未指定時はプロバイダーごとのデフォルトモデル
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// API キーを読む環境変数名（未指定時はプロバイダーごとの既定名）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// API のベース URL（プロキシやテスト用）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// 失敗時のリトライ回数
    pub retry_count: u32,
    /// 1回の呼び出しのタイムアウト（秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// ログ出力形式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// ロギング設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `RUST_LOG` 未設定時のフィルタ
    pub level: String,
    pub format: LogFormat,
    /// 指定時はこのディレクトリに日次ローテーションでファイル出力する
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            directory: None,
        }
    }
}

/// 設定ファイル全体
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub persona: PromptProfile,
    pub engine: EngineSettings,
    pub provider: ProviderSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// TOML ファイルから設定を読み込む
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(toml)?;
        if settings.engine.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "engine.max_tokens は 1 以上にしてください".to_string(),
            ));
        }
        Ok(settings)
    }

    /// ファイルが存在すれば読み込み、無ければデフォルト値を返す
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.persona.risk_profile, RiskProfile::Medium);
        assert_eq!(settings.engine.auto_advance_delay(), Duration::from_millis(1000));
        assert_eq!(settings.provider.kind, ProviderKind::Anthropic);
    }

    #[test]
    fn test_full_settings() {
        let toml = r#"
[persona]
risk_profile = "high"
tone = "formal"

[engine]
auto_advance_delay_ms = 0
max_tokens = 4096

[provider]
kind = "openai"
model = "gpt-4o-mini"
retry_count = 3
timeout_secs = 30

[logging]
level = "debug"
format = "json"
"#;
        let settings = Settings::from_toml(toml).unwrap();
        assert_eq!(settings.persona.risk_profile, RiskProfile::High);
        assert_eq!(settings.persona.tone.as_deref(), Some("formal"));
        assert_eq!(settings.engine.auto_advance_delay(), Duration::ZERO);
        assert_eq!(settings.engine.max_tokens, 4096);
        assert_eq!(settings.provider.kind, ProviderKind::OpenAI);
        assert_eq!(settings.provider.retry_count, 3);
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_zero_max_tokens_rejected() {
        let result = Settings::from_toml("[engine]\nmax_tokens = 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_unknown_risk_profile_rejected() {
        let result = Settings::from_toml("[persona]\nrisk_profile = \"extreme\"\n");
        assert!(matches!(result, Err(ConfigError::TomlDeserialize(_))));
    }
}
