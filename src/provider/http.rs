//! HTTP ベースのクライアントで共有する処理
//!
//! - APIキーの読み込み
//! - HTTP ステータスから [`ProviderError`] への分類
//! - レスポンス本文の送受信

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ProviderError;

/// 環境変数から API キーを読み込む
pub(crate) fn api_key_from_env(env_name: &str) -> Result<String, ProviderError> {
    match std::env::var(env_name) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ProviderError::MissingApiKey(env_name.to_string())),
    }
}

/// エラーステータスを [`ProviderError`] に分類
pub(crate) fn classify_status(status: u16, body: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthenticationError(body.to_string()),
        429 => ProviderError::RateLimitExceeded,
        408 | 504 => ProviderError::Timeout(body.to_string()),
        _ => ProviderError::Api {
            status,
            message: body.to_string(),
        },
    }
}

/// JSON を POST し、成功時は本文をデシリアライズして返す
pub(crate) async fn post_json<B, R>(
    request: reqwest::RequestBuilder,
    body: &B,
) -> Result<R, ProviderError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = request.json(body).send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(classify_status(status.as_u16(), &text));
    }

    serde_json::from_str(&text).map_err(|e| {
        ProviderError::InvalidResponse(format!("Failed to parse JSON: {}. Body was: {}", e, text))
    })
}
