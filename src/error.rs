//! エラー型の定義
//!
//! このモジュールは、設定レイヤーとプロバイダーレイヤーで使用されるエラー型を定義します。
//! エンジン固有のエラーは [`crate::engine::EngineError`] を参照してください。

use thiserror::Error;

/// 設定関連のエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// ファイルの読み込みに失敗
    #[error("設定ファイルの読み込みに失敗しました: {0}")]
    FileRead(#[from] std::io::Error),

    /// TOML のデシリアライズに失敗
    #[error("TOML のデシリアライズに失敗しました: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    /// TOML のシリアライズに失敗
    #[error("TOML のシリアライズに失敗しました: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON のデシリアライズに失敗（生成されたワークフロー等）
    #[error("JSON のデシリアライズに失敗しました: {0}")]
    JsonDeserialize(#[from] serde_json::Error),

    /// バリデーションエラー
    #[error("設定のバリデーションに失敗しました: {0}")]
    Validation(String),

    /// ロギングの初期化に失敗
    #[error("ロギングの初期化に失敗しました: {0}")]
    Logging(String),
}

/// LLMプロバイダー関連のエラー
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP通信エラー
    #[error("HTTP通信に失敗しました: {0}")]
    Http(#[from] reqwest::Error),

    /// APIキーが環境変数に設定されていない
    #[error("APIキーが見つかりません: 環境変数 {0} を設定してください")]
    MissingApiKey(String),

    /// 認証エラー
    #[error("認証に失敗しました: {0}")]
    AuthenticationError(String),

    /// レート制限超過
    #[error("レート制限を超えました")]
    RateLimitExceeded,

    /// タイムアウト
    #[error("タイムアウトしました: {0}")]
    Timeout(String),

    /// APIがエラーステータスを返した
    #[error("APIエラー (status {status}): {message}")]
    Api {
        /// HTTPステータスコード
        status: u16,
        /// レスポンス本文
        message: String,
    },

    /// 不正なレスポンス
    #[error("不正なレスポンスです: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// リトライで回復し得るエラーかどうか
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http(e) => e.is_timeout() || e.is_connect(),
            ProviderError::RateLimitExceeded | ProviderError::Timeout(_) => true,
            ProviderError::Api { status, .. } => *status >= 500,
            ProviderError::MissingApiKey(_)
            | ProviderError::AuthenticationError(_)
            | ProviderError::InvalidResponse(_) => false,
        }
    }
}
