//! 設定とワークフロー定義
//!
//! - [`workflow`][]: ワークフロー定義（ドメインモデル）
//! - [`step`][]: ステップ定義と入力モード
//! - [`settings`][]: アプリケーション設定（ペルソナ・エンジン・プロバイダー・ロギング）
//! - `dto`: デシリアライズ専用の DTO（内部実装）

pub(crate) mod dto;
pub mod settings;
pub mod step;
pub mod workflow;

pub use settings::{
    EngineSettings, LogFormat, LoggingSettings, PromptProfile, ProviderKind, ProviderSettings,
    RiskProfile, Settings,
};
pub use step::{InputType, StepDefinition};
pub use workflow::WorkflowDefinition;
