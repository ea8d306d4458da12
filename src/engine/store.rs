//! ステップ実行結果のストア
//!
//! # 責務
//!
//! - 1回のワークフロー実行における、ステップごとの結果 [`StepResult`] を保持
//! - ステップ ID ごとに最大1件（再実行は追記ではなく置き換え）
//! - 完了数の集計
//!
//! ストアの変更はエンジンのみが行います。外部には複製を返すアクセサだけを公開します。

use std::collections::HashMap;

use serde::Serialize;

/// スキップしたステップに記録する出力テキスト
pub const SKIPPED_OUTPUT: &str = "This step was skipped.";

/// ステップ実行結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    /// 対象ステップの ID
    pub step_id: String,

    /// AI に送信した入力（スキップ時は空文字）
    pub input: String,

    /// AI の出力（スキップ時は [`SKIPPED_OUTPUT`]）
    pub output: String,

    /// 結果（回答またはスキップ）が記録済みか
    pub completed: bool,

    /// 明示的にスキップされたか
    pub skipped: bool,
}

impl StepResult {
    /// 回答済みの結果を生成
    pub fn answered(
        step_id: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            input: input.into(),
            output: output.into(),
            completed: true,
            skipped: false,
        }
    }

    /// スキップされた結果を生成
    pub fn skipped(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            input: String::new(),
            output: SKIPPED_OUTPUT.to_string(),
            completed: true,
            skipped: true,
        }
    }
}

/// ステップ ID をキーとした結果ストア
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepResultStore {
    results: HashMap<String, StepResult>,
}

impl StepResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 結果を登録（同じステップの既存結果は置き換え）
    pub fn upsert(&mut self, result: StepResult) {
        self.results.insert(result.step_id.clone(), result);
    }

    pub fn get(&self, step_id: &str) -> Option<&StepResult> {
        self.results.get(step_id)
    }

    /// 完了済みの結果数
    pub fn completed_count(&self) -> usize {
        self.results.values().filter(|r| r.completed).count()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_replaces_existing() {
        let mut store = StepResultStore::new();
        store.upsert(StepResult::answered("a", "in1", "out1"));
        store.upsert(StepResult::answered("a", "in2", "out2"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().output, "out2");
    }

    #[test]
    fn test_skip_replaces_answer() {
        let mut store = StepResultStore::new();
        store.upsert(StepResult::answered("a", "in", "out"));
        store.upsert(StepResult::skipped("a"));

        let result = store.get("a").unwrap();
        assert!(result.skipped);
        assert!(result.completed);
        assert_eq!(result.input, "");
        assert_eq!(result.output, SKIPPED_OUTPUT);
    }

    #[test]
    fn test_completed_count_and_clear() {
        let mut store = StepResultStore::new();
        assert!(store.is_empty());
        store.upsert(StepResult::answered("a", "x", "y"));
        store.upsert(StepResult::skipped("b"));
        assert_eq!(store.completed_count(), 2);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.completed_count(), 0);
        assert!(store.get("a").is_none());
    }
}
