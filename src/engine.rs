//! ワークフロー実行エンジン
//!
//! # 責務
//!
//! - 選択されたワークフローをステップ単位で対話的に実行
//! - 前ステップの入出力を集約して `previous-output` ステップへ受け渡し
//! - ペルソナ設定に応じたプロンプト調整とサンプリング温度の決定
//! - 同時送信の排除（ビジーガード）と自動進行の制御
//! - 実行結果のテキスト文書へのエクスポート
//!
//! # モジュール構成
//!
//! - [`executor`][]: 実行エンジン本体（状態機械）
//! - [`store`][]: ステップ結果ストア
//! - [`context`][]: 前ステップのコンテキスト集約
//! - [`adaptation`][]: プロンプト調整
//! - [`export`][]: エクスポート
//! - [`result`][]: 状態・イベント・エラー型
//!
//! # 使用例
//!
//! ```rust,no_run
//! use legal_workflow::catalog::Catalog;
//! use legal_workflow::config::Settings;
//! use legal_workflow::engine::WorkflowEngine;
//! use legal_workflow::provider::create_provider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load_or_default(None)?;
//!     let engine = WorkflowEngine::new(
//!         Catalog::builtin()?,
//!         create_provider(&settings.provider),
//!         settings.persona.clone(),
//!         settings.engine.clone(),
//!     );
//!
//!     engine.select_workflow("contract-review")?;
//!     engine.submit_step_input("This Agreement is made between ...").await?;
//!     engine.skip_current_step()?;
//!
//!     let artifact = engine.export_workflow_results()?;
//!     artifact.write_to("exports")?;
//!     Ok(())
//! }
//! ```

pub mod adaptation;
pub mod context;
pub mod executor;
pub mod export;
pub mod result;
pub mod store;

// 公開APIの再エクスポート
pub use executor::WorkflowEngine;
pub use export::ExportArtifact;
pub use result::{EngineError, EngineEvent, RunPhase, StepOutcome};
pub use store::{StepResult, StepResultStore};
