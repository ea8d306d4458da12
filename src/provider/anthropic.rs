//! Anthropic Messages API クライアント実装
//!
//! # 責務
//!
//! - Messages API (`POST /v1/messages`) との通信を担当
//! - [`CompletionService`] トレイトを実装し、統一インターフェースを提供
//! - system メッセージを API の `system` フィールドへ分離
//!
//! # 認証
//!
//! 環境変数 `ANTHROPIC_API_KEY`（設定で変更可）を `x-api-key` ヘッダーで送信します。
//!
//! # 使用例
//!
//! ```rust,no_run
//! use legal_workflow::provider::anthropic::AnthropicClient;
//! use legal_workflow::provider::{ChatMessage, CompletionParams, CompletionService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = AnthropicClient::new("claude-sonnet-4-5");
//!     let response = client
//!         .complete(
//!             &[ChatMessage::user("Hello!")],
//!             &CompletionParams { temperature: 0.7, max_tokens: 256 },
//!         )
//!         .await
//!         .unwrap();
//!     println!("{}", response.content);
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::{api_key_from_env, post_json};
use super::model::{default_api_key_env, default_base_url};
use super::traits::{
    ChatMessage, CompletionParams, CompletionService, ProviderResponse, Role, StopReason,
    TokenUsage,
};
use crate::config::settings::ProviderKind;
use crate::error::ProviderError;

const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API クライアント
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key_env: String,
    model: String,
}

impl AnthropicClient {
    /// 既定のエンドポイントでクライアントを生成
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: default_base_url(ProviderKind::Anthropic).to_string(),
            api_key_env: default_api_key_env(ProviderKind::Anthropic).to_string(),
            model: model.into(),
        }
    }

    /// ベースURLを差し替える（プロキシやテスト用）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key_env(mut self, env: impl Into<String>) -> Self {
        self.api_key_env = env.into();
        self
    }

    /// 共通メッセージを API リクエストに変換
    ///
    /// system メッセージは改行で連結して `system` に入れ、残りを `messages` に入れます。
    fn build_request(&self, messages: &[ChatMessage], params: &CompletionParams) -> MessagesRequest {
        let system = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let turns = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| ApiMessage {
                role: if m.role == Role::Assistant { "assistant" } else { "user" },
                content: m.content.clone(),
            })
            .collect();

        MessagesRequest {
            model: self.model.clone(),
            system: Some(system).filter(|s| !s.is_empty()),
            messages: turns,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        }
    }
}

/// API レスポンスを共通形式に変換
fn into_provider_response(response: MessagesResponse) -> Result<ProviderResponse, ProviderError> {
    let content: String = response
        .content
        .iter()
        .filter(|block| block.block_type == "text")
        .filter_map(|block| block.text.as_deref())
        .collect();

    if content.trim().is_empty() {
        return Err(ProviderError::InvalidResponse(
            "No content in response".to_string(),
        ));
    }

    let stop_reason = match response.stop_reason.as_deref() {
        Some("end_turn") => StopReason::EndTurn,
        Some("max_tokens") => StopReason::MaxTokens,
        Some("stop_sequence") => StopReason::StopSequence,
        Some("refusal") => StopReason::ContentFilter,
        _ => StopReason::Unknown,
    };

    Ok(ProviderResponse {
        content,
        token_usage: TokenUsage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        },
        stop_reason,
        model: response.model,
    })
}

#[async_trait]
impl CompletionService for AnthropicClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let api_key = api_key_from_env(&self.api_key_env)?;
        let body = self.build_request(messages, params);

        let request = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION);

        let response: MessagesResponse = post_json(request, &body).await?;
        into_provider_response(response)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_splits_system() {
        let client = AnthropicClient::new("claude-sonnet-4-5");
        let messages = vec![
            ChatMessage::system("You are a legal assistant."),
            ChatMessage::user("Review this NDA."),
        ];
        let request = client.build_request(
            &messages,
            &CompletionParams {
                temperature: 0.5,
                max_tokens: 100,
            },
        );

        assert_eq!(request.system.as_deref(), Some("You are a legal assistant."));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        assert_eq!(request.max_tokens, 100);
    }

    #[test]
    fn test_parse_response() {
        let json = r#"{
            "id": "msg_1",
            "model": "claude-sonnet-4-5",
            "content": [{"type": "text", "text": "Hello, "}, {"type": "text", "text": "counsel."}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 4}
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(json).unwrap();
        let response = into_provider_response(parsed).unwrap();

        assert_eq!(response.content, "Hello, counsel.");
        assert_eq!(response.model, "claude-sonnet-4-5");
        assert_eq!(response.token_usage.total(), 16);
        assert_eq!(response.stop_reason, StopReason::EndTurn);
    }

    #[test]
    fn test_parse_response_without_text_is_invalid() {
        let json = r#"{"model": "m", "content": [], "stop_reason": "max_tokens"}"#;
        let parsed: MessagesResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            into_provider_response(parsed),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let client = AnthropicClient::new("claude-sonnet-4-5")
            .with_api_key_env("LEGAL_WORKFLOW_UNSET_ANTHROPIC_KEY")
            .with_base_url("http://127.0.0.1:9");
        let result = client
            .complete(
                &[ChatMessage::user("hi")],
                &CompletionParams {
                    temperature: 0.7,
                    max_tokens: 10,
                },
            )
            .await;
        assert!(matches!(result, Err(ProviderError::MissingApiKey(_))));
    }
}
