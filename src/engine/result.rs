//! エンジンの状態・イベント・エラー型の定義
//!
//! # 主要な型
//!
//! - [`RunPhase`][]: 実行状態（状態機械の状態）
//! - [`StepOutcome`][]: 回答またはスキップが記録された後の遷移結果
//! - [`EngineEvent`][]: UI 等へ通知するイベント
//! - [`EngineError`][]: エンジン操作のエラー型

use serde::Serialize;
use thiserror::Error;

use crate::error::{ConfigError, ProviderError};

/// ワークフロー実行の状態
///
/// ```text
/// NoActiveWorkflow --select--> AwaitingStepInput(0)
/// AwaitingStepInput(i) --submit--> SubmittingStep(i)
/// SubmittingStep(i) --success--> StepCompleted(i) --advance--> AwaitingStepInput(i+1)
///                                                  \--(i = last)--> WorkflowComplete
/// SubmittingStep(i) --failure--> AwaitingStepInput(i)
/// any --reset--> AwaitingStepInput(0)
/// any --go_to_step(j)--> AwaitingStepInput(j)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunPhase {
    NoActiveWorkflow,
    AwaitingStepInput(usize),
    SubmittingStep(usize),
    StepCompleted(usize),
    WorkflowComplete,
}

/// ステップ記録後の遷移結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// 次のステップへの移動を予約した（待機時間 0 の場合は移動済み）
    AdvanceScheduled { next_index: usize },
    /// 最後のステップだったためワークフロー完了
    WorkflowComplete,
    /// 記録のみ（応答待ちの間に別のステップへ移動していた）
    Recorded,
}

/// エンジンから通知されるイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    WorkflowSelected { workflow_id: String },
    WorkflowReset { workflow_id: String },
    StepCompleted { step_id: String },
    StepSkipped { step_id: String },
    /// 一時的なエラー通知（再送信で回復可能）
    StepFailed { step_id: String, message: String },
    StepAdvanced { index: usize },
    WorkflowCompleted { workflow_id: String },
}

/// エンジン操作のエラー
///
/// いずれも致命的ではなく、エンジンの状態は呼び出し前のまま保たれます。
#[derive(Debug, Error)]
pub enum EngineError {
    /// ワークフローが選択されていない
    #[error("ワークフローが選択されていません")]
    NoActiveWorkflow,

    /// 範囲外のステップインデックス
    #[error("ステップインデックス {index} は範囲外です（ステップ数: {len}）")]
    InvalidStepIndex { index: usize, len: usize },

    /// カタログに存在しないワークフロー
    #[error("ワークフロー '{0}' が見つかりません")]
    UnknownWorkflow(String),

    /// CompletionService の呼び出しに失敗
    #[error("ステップ '{step_id}' の実行に失敗しました: {source}")]
    CompletionFailure {
        step_id: String,
        #[source]
        source: ProviderError,
    },

    /// 前の送信がまだ完了していない
    #[error("前の処理が完了していません")]
    Busy,

    /// 生成されたワークフローが不正
    #[error("生成されたワークフローが不正です: {0}")]
    MalformedGeneratedWorkflow(String),

    /// 応答待ちの間にワークフローがリセット・再選択された
    #[error("実行中にワークフローがリセットされたため、結果を破棄しました")]
    RunSuperseded,

    /// エクスポートファイルの書き出しに失敗
    #[error("エクスポートに失敗しました: {0}")]
    Export(#[from] std::io::Error),
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::MalformedGeneratedWorkflow(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_failure_message() {
        let err = EngineError::CompletionFailure {
            step_id: "summary".to_string(),
            source: ProviderError::RateLimitExceeded,
        };
        assert_eq!(
            err.to_string(),
            "ステップ 'summary' の実行に失敗しました: レート制限を超えました"
        );
    }

    #[test]
    fn test_config_error_becomes_malformed_workflow() {
        let err = EngineError::from(ConfigError::Validation("steps が空です".to_string()));
        assert!(matches!(err, EngineError::MalformedGeneratedWorkflow(_)));
        assert!(err.to_string().contains("steps が空です"));
    }

    #[test]
    fn test_invalid_index_message() {
        let err = EngineError::InvalidStepIndex { index: 5, len: 3 };
        assert_eq!(
            err.to_string(),
            "ステップインデックス 5 は範囲外です（ステップ数: 3）"
        );
    }
}
