//! リトライとタイムアウトを付与する [`CompletionService`] ラッパー
//!
//! 回復し得るエラー（[`ProviderError::is_retryable`]）の場合のみ、
//! 一定間隔をあけて最大 `max_retries` 回まで再試行します。
//! エンジンからは1回の呼び出しとして見えます。

use std::time::Duration;

use async_trait::async_trait;

use super::traits::{ChatMessage, CompletionParams, CompletionService, ProviderResponse};
use crate::error::ProviderError;

/// リトライ間の既定の待機時間
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// リトライ設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
    /// 1回の試行のタイムアウト
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            delay: DEFAULT_RETRY_DELAY,
            timeout: None,
        }
    }
}

/// リトライ機能付きの補完サービス
pub struct RetryingService<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: CompletionService> RetryingService<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// タイムアウト付きで1回だけ実行
    async fn attempt(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<ProviderResponse, ProviderError> {
        match self.policy.timeout {
            Some(limit) => tokio::time::timeout(limit, self.inner.complete(messages, params))
                .await
                .map_err(|_| {
                    ProviderError::Timeout(format!("{}秒以内に応答がありませんでした", limit.as_secs()))
                })?,
            None => self.inner.complete(messages, params).await,
        }
    }
}

#[async_trait]
impl<S: CompletionService> CompletionService for RetryingService<S> {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.attempt(messages, params).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(attempts = attempt + 1, "completion succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max_retries = self.policy.max_retries,
                        error = %e,
                        "completion failed, retrying"
                    );
                    tokio::time::sleep(self.policy.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
