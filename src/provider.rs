//! LLMプロバイダー抽象化レイヤー
//!
//! # 責務
//!
//! - 複数のLLMプロバイダー（Anthropic, OpenAI, Gemini）を統一的に扱う
//!   [`CompletionService`] トレイトを提供
//! - 設定に応じた適切なクライアントを生成するファクトリー機能
//! - リトライ・タイムアウトのラッパー
//!
//! # モジュール構成
//!
//! - `traits` - 共通インターフェース（[`CompletionService`]トレイト等）
//! - `model` - プロバイダーごとの既定値（モデル名・APIキー環境変数・URL）
//! - `anthropic` / `openai` / `gemini` - HTTP クライアント
//! - `retry` - リトライとタイムアウト
//!
//! # 使用例
//!
//! ```rust,no_run
//! use legal_workflow::config::ProviderSettings;
//! use legal_workflow::provider::{create_provider, ChatMessage, CompletionParams};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 事前に ANTHROPIC_API_KEY の設定が必要
//!     let client = create_provider(&ProviderSettings::default());
//!
//!     let response = client
//!         .complete(
//!             &[ChatMessage::user("Explain consideration in contract law in one sentence.")],
//!             &CompletionParams { temperature: 0.5, max_tokens: 200 },
//!         )
//!         .await?;
//!
//!     println!("Response: {}", response.content);
//!     Ok(())
//! }
//! ```

pub mod anthropic;
pub mod gemini;
pub(crate) mod http;
pub mod model;
pub mod openai;
pub mod retry;
pub mod traits;

// 公開APIの再エクスポート
pub use retry::{RetryPolicy, RetryingService};
pub use traits::{
    ChatMessage, CompletionParams, CompletionService, ProviderResponse, Role, StopReason,
    TokenUsage,
};

use std::sync::Arc;
use std::time::Duration;

use crate::config::settings::{ProviderKind, ProviderSettings};
use model::Endpoint;

/// 補完サービスを生成するファクトリー関数
///
/// 設定されたプロバイダーのクライアントを生成し、リトライ・タイムアウト設定を付与します。
/// APIキーは呼び出し時に環境変数から読み込むため、生成自体は失敗しません。
pub fn create_provider(settings: &ProviderSettings) -> Arc<dyn CompletionService> {
    let endpoint = Endpoint::resolve(settings);
    tracing::debug!(
        provider = ?settings.kind,
        model = %endpoint.model,
        base_url = %endpoint.base_url,
        "creating completion provider"
    );

    let client: Box<dyn CompletionService> = match settings.kind {
        ProviderKind::Anthropic => Box::new(
            anthropic::AnthropicClient::new(endpoint.model)
                .with_base_url(endpoint.base_url)
                .with_api_key_env(endpoint.api_key_env),
        ),
        ProviderKind::OpenAI => Box::new(
            openai::OpenAIClient::new(endpoint.model)
                .with_base_url(endpoint.base_url)
                .with_api_key_env(endpoint.api_key_env),
        ),
        ProviderKind::Gemini => Box::new(
            gemini::GeminiClient::new(endpoint.model)
                .with_base_url(endpoint.base_url)
                .with_api_key_env(endpoint.api_key_env),
        ),
    };

    let policy = RetryPolicy {
        max_retries: settings.retry_count,
        timeout: settings.timeout_secs.map(Duration::from_secs),
        ..Default::default()
    };

    Arc::new(RetryingService::new(client, policy))
}
