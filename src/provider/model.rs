//! プロバイダーごとの既定値
//!
//! # 責務
//!
//! - [`ProviderKind`] から既定のモデル名・APIキー環境変数名・ベースURLを解決
//! - 設定ファイルの値が指定されていればそちらを優先
//!
//! # 既定値
//!
//! | Provider  | Model             | API key env         |
//! |-----------|-------------------|---------------------|
//! | Anthropic | claude-sonnet-4-5 | `ANTHROPIC_API_KEY` |
//! | OpenAI    | gpt-4o            | `OPENAI_API_KEY`    |
//! | Gemini    | gemini-1.5-pro    | `GEMINI_API_KEY`    |
//!
//! # 使用例
//!
//! ```rust
//! use legal_workflow::provider::model::default_model;
//! use legal_workflow::config::ProviderKind;
//!
//! assert_eq!(default_model(ProviderKind::Anthropic), "claude-sonnet-4-5");
//! ```

use crate::config::settings::{ProviderKind, ProviderSettings};

// Anthropic
const ANTHROPIC_MODEL: &str = "claude-sonnet-4-5";
const ANTHROPIC_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

// OpenAI
const OPENAI_MODEL: &str = "gpt-4o";
const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
const OPENAI_BASE_URL: &str = "https://api.openai.com";

// Gemini
const GEMINI_MODEL: &str = "gemini-1.5-pro";
const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// 既定のモデル名
pub fn default_model(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Anthropic => ANTHROPIC_MODEL,
        ProviderKind::OpenAI => OPENAI_MODEL,
        ProviderKind::Gemini => GEMINI_MODEL,
    }
}

/// 既定のAPIキー環境変数名
pub fn default_api_key_env(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Anthropic => ANTHROPIC_KEY_ENV,
        ProviderKind::OpenAI => OPENAI_KEY_ENV,
        ProviderKind::Gemini => GEMINI_KEY_ENV,
    }
}

/// 既定のベースURL
pub fn default_base_url(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Anthropic => ANTHROPIC_BASE_URL,
        ProviderKind::OpenAI => OPENAI_BASE_URL,
        ProviderKind::Gemini => GEMINI_BASE_URL,
    }
}

/// 設定値と既定値を合わせたエンドポイント情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub model: String,
    pub api_key_env: String,
    pub base_url: String,
}

impl Endpoint {
    pub fn resolve(settings: &ProviderSettings) -> Self {
        let kind = settings.kind;
        Self {
            model: settings
                .model
                .clone()
                .unwrap_or_else(|| default_model(kind).to_string()),
            api_key_env: settings
                .api_key_env
                .clone()
                .unwrap_or_else(|| default_api_key_env(kind).to_string()),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url(kind).to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }
}
