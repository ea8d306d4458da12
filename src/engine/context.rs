//! 前ステップのコンテキスト集約
//!
//! # 責務
//!
//! `previous-output` 入力のステップに渡すため、それより前のステップの
//! 入力と出力を1つのテキストに連結します。
//!
//! # 集約規則
//!
//! - 対象は `up_to_index` より前のステップのみ（定義順）
//! - 結果が無いステップ、スキップされたステップは丸ごと省略
//! - 各ブロックは `Step: <title>\nInput: <input>\nOutput: <output>`
//! - ブロック同士は空行で区切る
//! - 対象が無ければ空文字を返す（代替文の挿入は呼び出し側の責務）
//!
//! # 使用例
//!
//! ```rust
//! use legal_workflow::config::{InputType, StepDefinition, WorkflowDefinition};
//! use legal_workflow::engine::context::aggregate;
//! use legal_workflow::engine::store::{StepResult, StepResultStore};
//!
//! let workflow = WorkflowDefinition::new("w", "W", vec![
//!     StepDefinition::new("a", "A", "do a", InputType::Text),
//!     StepDefinition::new("b", "B", "do b", InputType::PreviousOutput),
//! ]).unwrap();
//!
//! let mut store = StepResultStore::new();
//! store.upsert(StepResult::answered("a", "x", "y"));
//!
//! assert_eq!(aggregate(&workflow, 1, &store), "Step: A\nInput: x\nOutput: y");
//! ```

use crate::config::workflow::WorkflowDefinition;
use crate::engine::store::StepResultStore;

/// 集約結果が空のときに AI へ送る代替テキスト
pub const NO_CONTEXT_SENTINEL: &str = "No previous context available.";

/// `up_to_index` より前のステップの入出力を連結する
pub fn aggregate(workflow: &WorkflowDefinition, up_to_index: usize, results: &StepResultStore) -> String {
    workflow
        .steps()
        .iter()
        .take(up_to_index)
        .filter_map(|step| {
            let result = results.get(step.id())?;
            if result.skipped || !result.completed {
                return None;
            }
            Some(format!(
                "Step: {}\nInput: {}\nOutput: {}",
                step.title(),
                result.input,
                result.output
            ))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 集約し、空なら [`NO_CONTEXT_SENTINEL`] に置き換える
pub fn aggregate_or_sentinel(
    workflow: &WorkflowDefinition,
    up_to_index: usize,
    results: &StepResultStore,
) -> String {
    let context = aggregate(workflow, up_to_index, results);
    if context.is_empty() {
        NO_CONTEXT_SENTINEL.to_string()
    } else {
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::step::{InputType, StepDefinition};
    use crate::engine::store::StepResult;

    fn workflow() -> WorkflowDefinition {
        WorkflowDefinition::new(
            "w",
            "Workflow",
            vec![
                StepDefinition::new("a", "A", "do a", InputType::Text),
                StepDefinition::new("b", "B", "do b", InputType::Text),
                StepDefinition::new("c", "C", "do c", InputType::PreviousOutput),
                StepDefinition::new("d", "D", "do d", InputType::Text),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_blocks_are_joined_in_definition_order() {
        let mut store = StepResultStore::new();
        // 登録順とは無関係に定義順で並ぶ
        store.upsert(StepResult::answered("b", "x2", "y2"));
        store.upsert(StepResult::answered("a", "x1", "y1"));

        assert_eq!(
            aggregate(&workflow(), 2, &store),
            "Step: A\nInput: x1\nOutput: y1\n\nStep: B\nInput: x2\nOutput: y2"
        );
    }

    #[test]
    fn test_skipped_and_missing_steps_are_omitted() {
        let mut store = StepResultStore::new();
        store.upsert(StepResult::skipped("a"));
        store.upsert(StepResult::answered("b", "x2", "y2"));

        let context = aggregate(&workflow(), 3, &store);
        assert_eq!(context, "Step: B\nInput: x2\nOutput: y2");
        assert!(!context.contains("Step: A"));
    }

    #[test]
    fn test_steps_at_or_after_index_are_excluded() {
        let mut store = StepResultStore::new();
        store.upsert(StepResult::answered("a", "x1", "y1"));
        store.upsert(StepResult::answered("d", "later", "later"));

        let context = aggregate(&workflow(), 2, &store);
        assert!(!context.contains("later"));
    }

    #[test]
    fn test_empty_context_uses_sentinel() {
        let mut store = StepResultStore::new();
        assert_eq!(aggregate(&workflow(), 0, &store), "");
        store.upsert(StepResult::skipped("a"));
        assert_eq!(aggregate_or_sentinel(&workflow(), 2, &store), NO_CONTEXT_SENTINEL);
    }
}
