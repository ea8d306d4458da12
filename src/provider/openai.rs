//! OpenAI Chat Completions API クライアント実装
//!
//! # 責務
//!
//! - Chat Completions API (`POST /v1/chat/completions`) との通信を担当
//! - [`CompletionService`] トレイトを実装し、統一インターフェースを提供
//! - OpenAI固有のレスポンス形式と共通型の変換
//!
//! # 認証
//!
//! 環境変数 `OPENAI_API_KEY`（設定で変更可）を Bearer トークンとして送信します。
//!
//! # 出力形式
//!
//! ```json
//! {
//!   "model": "gpt-4o",
//!   "choices": [{"message": {"role": "assistant", "content": "..."}, "finish_reason": "stop"}],
//!   "usage": {"prompt_tokens": 10, "completion_tokens": 5}
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::{api_key_from_env, post_json};
use super::model::{default_api_key_env, default_base_url};
use super::traits::{
    ChatMessage, CompletionParams, CompletionService, ProviderResponse, StopReason, TokenUsage,
};
use crate::config::settings::ProviderKind;
use crate::error::ProviderError;

/// OpenAI Chat Completions クライアント
pub struct OpenAIClient {
    http: reqwest::Client,
    base_url: String,
    api_key_env: String,
    model: String,
}

impl OpenAIClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: default_base_url(ProviderKind::OpenAI).to_string(),
            api_key_env: default_api_key_env(ProviderKind::OpenAI).to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key_env(mut self, env: impl Into<String>) -> Self {
        self.api_key_env = env.into();
        self
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        params: &CompletionParams,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }
    }
}

/// APIレスポンスを共通形式に変換
fn into_provider_response(response: ChatResponse) -> Result<ProviderResponse, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

    let content = choice.message.content.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(ProviderError::InvalidResponse(
            "No content in response".to_string(),
        ));
    }

    let stop_reason = match choice.finish_reason.as_deref() {
        Some("stop") => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        Some("content_filter") => StopReason::ContentFilter,
        _ => StopReason::Unknown,
    };

    let usage = response.usage.unwrap_or_default();
    Ok(ProviderResponse {
        content,
        token_usage: TokenUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        },
        stop_reason,
        model: if response.model.is_empty() {
            "unknown".to_string()
        } else {
            response.model
        },
    })
}

#[async_trait]
impl CompletionService for OpenAIClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let api_key = api_key_from_env(&self.api_key_env)?;
        let body = self.build_request(messages, params);

        let request = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(api_key);

        let response: ChatResponse = post_json(request, &body).await?;
        into_provider_response(response)
    }
}

// リクエスト / レスポンス型定義

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<ProviderResponse, ProviderError> {
        into_provider_response(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_request_serializes_roles() {
        let client = OpenAIClient::new("gpt-4o");
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let request = client.build_request(
            &messages,
            &CompletionParams {
                temperature: 0.8,
                max_tokens: 64,
            },
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 64);
    }

    #[test]
    fn test_parse_success() {
        let response = parse(
            r#"{"model":"gpt-4o","choices":[{"message":{"role":"assistant","content":"Hello, world!"},"finish_reason":"stop"}],"usage":{"prompt_tokens":10,"completion_tokens":5}}"#,
        )
        .unwrap();
        assert_eq!(response.content, "Hello, world!");
        assert_eq!(response.model, "gpt-4o");
        assert_eq!(response.token_usage.input_tokens, 10);
        assert_eq!(response.token_usage.output_tokens, 5);
        assert_eq!(response.stop_reason, StopReason::EndTurn);
    }

    #[test]
    fn test_parse_max_tokens() {
        let response = parse(
            r#"{"model":"gpt-4o","choices":[{"message":{"content":"Truncated"},"finish_reason":"length"}]}"#,
        )
        .unwrap();
        assert_eq!(response.stop_reason, StopReason::MaxTokens);
        assert_eq!(response.token_usage.total(), 0);
    }

    #[test]
    fn test_parse_empty_choices() {
        assert!(matches!(
            parse(r#"{"model":"gpt-4o","choices":[]}"#),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_null_content() {
        assert!(matches!(
            parse(r#"{"model":"gpt-4o","choices":[{"message":{"content":null},"finish_reason":"content_filter"}]}"#),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}
