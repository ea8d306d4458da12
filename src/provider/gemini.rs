//! Google Gemini `generateContent` API クライアント実装
//!
//! system メッセージは `systemInstruction` に、assistant は `model` ロールに変換します。
//! 認証は環境変数 `GEMINI_API_KEY`（設定で変更可）を `x-goog-api-key` ヘッダーで送信します。

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

/// Gemini API クライアント
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key_env: String,
    model: String,
}

impl GeminiClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: default_base_url(ProviderKind::Gemini).to_string(),
            api_key_env: default_api_key_env(ProviderKind::Gemini).to_string(),
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

    fn build_request(&self, messages: &[ChatMessage], params: &CompletionParams) -> GenerateRequest {
        let system_text = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let contents = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| Content {
                role: Some(if m.role == Role::Assistant { "model" } else { "user" }.to_string()),
                parts: vec![Part {
                    text: Some(m.content.clone()),
                }],
            })
            .collect();

        GenerateRequest {
            system_instruction: (!system_text.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: Some(system_text),
                }],
            }),
            contents,
            generation_config: GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_tokens,
            },
        }
    }
}

fn into_provider_response(
    response: GenerateResponse,
    model: &str,
) -> Result<ProviderResponse, ProviderError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("No candidates in response".to_string()))?;

    let content: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(ProviderError::InvalidResponse(
            "No content in response".to_string(),
        ));
    }

    let stop_reason = match candidate.finish_reason.as_deref() {
        Some("STOP") => StopReason::EndTurn,
        Some("MAX_TOKENS") => StopReason::MaxTokens,
        Some("SAFETY") | Some("RECITATION") => StopReason::ContentFilter,
        _ => StopReason::Unknown,
    };

    let usage = response.usage_metadata.unwrap_or_default();
    Ok(ProviderResponse {
        content,
        token_usage: TokenUsage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        },
        stop_reason,
        model: model.to_string(),
    })
}

#[async_trait]
impl CompletionService for GeminiClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let api_key = api_key_from_env(&self.api_key_env)?;
        let body = self.build_request(messages, params);

        let request = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", api_key);

        let response: GenerateResponse = post_json(request, &body).await?;
        into_provider_response(response, &self.model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_maps_roles() {
        let client = GeminiClient::new("gemini-1.5-pro");
        let messages = vec![
            ChatMessage::system("be precise"),
            ChatMessage::user("question"),
            ChatMessage::assistant("answer"),
        ];
        let request = client.build_request(
            &messages,
            &CompletionParams {
                temperature: 0.5,
                max_tokens: 512,
            },
        );
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be precise");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 512);
    }

    #[test]
    fn test_parse_response() {
        let json = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Clause 4 "}, {"text": "is void."}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 20, "candidatesTokenCount": 6}
        }"#;
        let response =
            into_provider_response(serde_json::from_str(json).unwrap(), "gemini-1.5-pro").unwrap();
        assert_eq!(response.content, "Clause 4 is void.");
        assert_eq!(response.token_usage.total(), 26);
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.model, "gemini-1.5-pro");
    }

    #[test]
    fn test_parse_safety_block_without_text() {
        let json = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let result = into_provider_response(serde_json::from_str(json).unwrap(), "g");
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }
}
