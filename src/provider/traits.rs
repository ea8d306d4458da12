//! LLMプロバイダーの共通インターフェース定義
//!
//! # 責務
//!
//! - 補完サービスの共通トレイト [`CompletionService`] を定義
//! - ロール付きメッセージ [`ChatMessage`] とサンプリング設定 [`CompletionParams`] を定義
//! - プロバイダー非依存のレスポンス型 [`ProviderResponse`] を提供
//! - トークン使用量 [`TokenUsage`] と停止理由 [`StopReason`] の型を定義
//!
//! # 使用例
//!
//! ```rust,no_run
//! use legal_workflow::provider::{ChatMessage, CompletionParams, CompletionService};
//!
//! async fn example(service: &dyn CompletionService) {
//!     let messages = vec![
//!         ChatMessage::system("You are a careful legal assistant."),
//!         ChatMessage::user("Summarize this clause: ..."),
//!     ];
//!     let params = CompletionParams { temperature: 0.7, max_tokens: 1024 };
//!
//!     let response = service.complete(&messages, &params).await.unwrap();
//!     println!("Response: {}", response.content);
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// 補完サービスの共通インターフェース
///
/// このトレイトを実装することで、任意のLLMプロバイダーを
/// エンジンに統合できます。テストではスタブ実装を渡します。
///
/// # 実装要件
///
/// - `Send + Sync`: マルチスレッド環境で安全に使用可能
/// - 失敗は panic ではなく [`ProviderError`] で返すこと
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// メッセージ列を送信し、生成テキストを取得する
    ///
    /// # 引数
    ///
    /// - `messages`: ロール付きメッセージ（先頭は通常 system）
    /// - `params`: サンプリング設定
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<ProviderResponse, ProviderError>;
}

#[async_trait]
impl<S: CompletionService + ?Sized> CompletionService for std::sync::Arc<S> {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<ProviderResponse, ProviderError> {
        (**self).complete(messages, params).await
    }
}

#[async_trait]
impl<S: CompletionService + ?Sized> CompletionService for Box<S> {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<ProviderResponse, ProviderError> {
        (**self).complete(messages, params).await
    }
}

/// メッセージのロール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// ロール付きメッセージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// サンプリング設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// LLMプロバイダーからのレスポンス
///
/// プロバイダー固有のレスポンス形式を共通の型に変換したもの。
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// LLMが生成したテキスト
    pub content: String,

    /// トークン使用量
    pub token_usage: TokenUsage,

    /// 生成停止理由
    pub stop_reason: StopReason,

    /// 使用されたモデル名（例: "claude-sonnet-4-5", "gpt-4o"）
    pub model: String,
}

impl ProviderResponse {
    /// テキストだけを持つレスポンスを生成（スタブ実装用）
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            token_usage: TokenUsage::default(),
            stop_reason: StopReason::EndTurn,
            model: "unknown".to_string(),
        }
    }
}

/// トークン使用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    /// 入力トークン数（プロンプト）
    pub input_tokens: u32,

    /// 出力トークン数（LLM生成テキスト）
    pub output_tokens: u32,
}

impl TokenUsage {
    /// 総トークン数を計算
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// LLMの生成停止理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 自然な終了（LLMが完了を判断）
    EndTurn,

    /// 最大トークン数到達
    MaxTokens,

    /// 停止シーケンス検出
    StopSequence,

    /// コンテンツフィルター発動
    ContentFilter,

    /// 不明な理由
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 250,
        };
        assert_eq!(usage.total(), 350);
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, Role::System);
        assert_eq!(ChatMessage::user("u").role, Role::User);
        assert_eq!(ChatMessage::assistant("a").content, "a");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }
}
