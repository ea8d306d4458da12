//! ワークフローカタログ
//!
//! # 責務
//!
//! - 組み込みワークフロー（`workflows/*.toml` をバイナリに埋め込み）の提供
//! - ディレクトリ内の TOML ワークフローの追加読み込み
//! - ID による検索と一覧
//!
//! 同じ ID のワークフローを追加した場合は置き換えます（ユーザー定義で組み込みを上書き可能）。

use std::path::Path;
use std::sync::Arc;

use crate::config::workflow::WorkflowDefinition;
use crate::error::ConfigError;

const BUILTIN_WORKFLOWS: &[(&str, &str)] = &[
    (
        "contract-review.toml",
        include_str!("../workflows/contract-review.toml"),
    ),
    (
        "litigation-research.toml",
        include_str!("../workflows/litigation-research.toml"),
    ),
    (
        "due-diligence.toml",
        include_str!("../workflows/due-diligence.toml"),
    ),
];

/// 選択可能なワークフローの集合（登録順を保持）
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    workflows: Vec<Arc<WorkflowDefinition>>,
}

impl Catalog {
    /// 空のカタログ
    pub fn new() -> Self {
        Self::default()
    }

    /// 組み込みワークフローのカタログ
    pub fn builtin() -> Result<Self, ConfigError> {
        let mut catalog = Self::new();
        for (name, source) in BUILTIN_WORKFLOWS {
            let workflow = WorkflowDefinition::from_toml(source).map_err(|e| {
                ConfigError::Validation(format!("組み込みワークフロー {} が不正です: {}", name, e))
            })?;
            catalog.insert(workflow);
        }
        Ok(catalog)
    }

    /// ワークフロー列からカタログを生成（ID 重複はエラー）
    pub fn from_workflows(workflows: Vec<WorkflowDefinition>) -> Result<Self, ConfigError> {
        let mut catalog = Self::new();
        for workflow in workflows {
            if catalog.get(workflow.id()).is_some() {
                return Err(ConfigError::Validation(format!(
                    "ワークフロー ID '{}' が重複しています",
                    workflow.id()
                )));
            }
            catalog.insert(workflow);
        }
        Ok(catalog)
    }

    /// ワークフローを追加（同じ ID があれば置き換え）
    pub fn insert(&mut self, workflow: WorkflowDefinition) {
        let workflow = Arc::new(workflow);
        match self.workflows.iter_mut().find(|w| w.id() == workflow.id()) {
            Some(existing) => {
                tracing::debug!(workflow_id = %workflow.id(), "replacing workflow in catalog");
                *existing = workflow;
            }
            None => self.workflows.push(workflow),
        }
    }

    /// ディレクトリ内の `*.toml` をすべて読み込む
    ///
    /// ファイル名順に読み込み、読み込んだ件数を返します。
    /// 1つでも不正なファイルがあればエラーになります。
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, ConfigError> {
        let dir = dir.as_ref();
        let mut paths = std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        paths.retain(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "toml"));
        paths.sort();

        for path in &paths {
            let workflow = WorkflowDefinition::from_file(path).map_err(|e| {
                ConfigError::Validation(format!("{} の読み込みに失敗しました: {}", path.display(), e))
            })?;
            tracing::info!(workflow_id = %workflow.id(), path = %path.display(), "workflow loaded");
            self.insert(workflow);
        }
        Ok(paths.len())
    }

    pub fn get(&self, workflow_id: &str) -> Option<Arc<WorkflowDefinition>> {
        self.workflows.iter().find(|w| w.id() == workflow_id).cloned()
    }

    pub fn list(&self) -> impl Iterator<Item = &WorkflowDefinition> {
        self.workflows.iter().map(|w| w.as_ref())
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::step::{InputType, StepDefinition};

    fn workflow(id: &str, title: &str) -> WorkflowDefinition {
        WorkflowDefinition::new(
            id,
            title,
            vec![StepDefinition::new("s", "S", "do it", InputType::Text)],
        )
        .unwrap()
    }

    #[test]
    fn test_builtin_workflows_are_valid() {
        let catalog = Catalog::builtin().unwrap();
        let ids: Vec<_> = catalog.list().map(|w| w.id().to_string()).collect();
        assert_eq!(
            ids,
            vec!["contract-review", "litigation-research", "due-diligence"]
        );
        for workflow in catalog.list() {
            assert!(!workflow.description().is_empty());
            assert!(
                workflow
                    .steps()
                    .iter()
                    .any(|s| s.input_type() == InputType::PreviousOutput)
            );
        }
    }

    #[test]
    fn test_from_workflows_rejects_duplicates() {
        let result = Catalog::from_workflows(vec![workflow("a", "A"), workflow("a", "B")]);
        assert!(result.unwrap_err().to_string().contains("重複"));
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let mut catalog = Catalog::from_workflows(vec![workflow("a", "A")]).unwrap();
        catalog.insert(workflow("a", "Replaced"));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("a").unwrap().title(), "Replaced");
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_load_dir_reads_only_toml_files() {
        let dir = tempfile::tempdir().unwrap();
        workflow("custom", "Custom").to_file(dir.path().join("custom.toml")).unwrap();
        std::fs::write(dir.path().join("notes.md"), "not a workflow").unwrap();

        let mut catalog = Catalog::builtin().unwrap();
        let loaded = catalog.load_dir(dir.path()).unwrap();

        assert_eq!(loaded, 1);
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.get("custom").unwrap().title(), "Custom");
    }

    #[test]
    fn test_load_dir_reports_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.toml"), "[workflow]\nid = \"x\"\n").unwrap();

        let err = Catalog::new().load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }
}
