//! 実行結果のエクスポート
//!
//! ストアの内容をステップ定義順に並べ、人が読めるテキスト文書にします。
//! ストアは読み取るだけで変更しません。
//!
//! # 出力形式
//!
//! ```text
//! # Contract Review
//! Exported: 2024-05-01
//!
//! ---
//!
//! ## Step 1: Summarize
//!
//! ### Input
//!
//! <input>
//!
//! ### Output
//!
//! <output>
//!
//! ---
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::config::step::InputType;
use crate::config::workflow::WorkflowDefinition;
use crate::engine::store::StepResultStore;

const DIVIDER: &str = "---";
const SKIPPED_MARKER: &str = "_(skipped)_";
const NOT_COMPLETED_MARKER: &str = "_(not completed)_";

/// エクスポートされた文書
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content: String,
}

impl ExportArtifact {
    /// ディレクトリに書き出し、書き出したパスを返す
    pub fn write_to(&self, dir: impl AsRef<Path>) -> std::io::Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.content)?;
        Ok(path)
    }
}

/// ワークフローと結果から文書を生成する
pub fn export(workflow: &WorkflowDefinition, results: &StepResultStore, date: NaiveDate) -> ExportArtifact {
    ExportArtifact {
        file_name: export_file_name(workflow.title(), date),
        content: render_document(workflow, results, date),
    }
}

/// `<slug>-<yyyy-mm-dd>.txt`
pub fn export_file_name(title: &str, date: NaiveDate) -> String {
    let slug = slugify(title);
    let slug = if slug.is_empty() { "workflow".to_string() } else { slug };
    format!("{}-{}.txt", slug, date.format("%Y-%m-%d"))
}

/// 英数字以外の連続を `-` 1文字にまとめ、小文字化する
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// 文書本文を生成する
pub fn render_document(workflow: &WorkflowDefinition, results: &StepResultStore, date: NaiveDate) -> String {
    let mut doc = format!(
        "# {}\nExported: {}\n\n{}\n",
        workflow.title(),
        date.format("%Y-%m-%d"),
        DIVIDER
    );

    for (index, step) in workflow.steps().iter().enumerate() {
        doc.push_str(&format!("\n## Step {}: {}\n\n", index + 1, step.title()));

        match results.get(step.id()) {
            Some(result) if result.skipped => {
                doc.push_str(&format!("{}\n", SKIPPED_MARKER));
            }
            Some(result) if result.completed => {
                if step.input_type() != InputType::PreviousOutput {
                    doc.push_str(&format!("### Input\n\n{}\n\n", result.input));
                }
                doc.push_str(&format!("### Output\n\n{}\n", result.output));
            }
            _ => {
                doc.push_str(&format!("{}\n", NOT_COMPLETED_MARKER));
            }
        }

        doc.push_str(&format!("\n{}\n", DIVIDER));
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::step::StepDefinition;
    use crate::engine::store::{SKIPPED_OUTPUT, StepResult};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn workflow() -> WorkflowDefinition {
        WorkflowDefinition::new(
            "review",
            "Contract Review: Phase 1",
            vec![
                StepDefinition::new("first", "First", "p1", InputType::Text),
                StepDefinition::new("second", "Second", "p2", InputType::Text),
                StepDefinition::new("third", "Third", "p3", InputType::PreviousOutput),
                StepDefinition::new("fourth", "Fourth", "p4", InputType::Text),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_completed_and_skipped_steps() {
        let mut store = StepResultStore::new();
        store.upsert(StepResult::answered("first", "in1", "out1"));
        store.upsert(StepResult::skipped("second"));

        let doc = render_document(&workflow(), &store, date());

        assert!(doc.starts_with("# Contract Review: Phase 1\nExported: 2024-05-01\n"));
        assert!(doc.contains("## Step 1: First\n\n### Input\n\nin1\n\n### Output\n\nout1\n"));
        assert!(doc.contains("## Step 2: Second\n\n_(skipped)_\n"));
        assert!(!doc.contains(SKIPPED_OUTPUT));
        assert_eq!(doc.matches("### Input").count(), 1);
    }

    #[test]
    fn test_previous_output_step_omits_input() {
        let mut store = StepResultStore::new();
        store.upsert(StepResult::answered("third", "aggregated context", "report"));

        let doc = render_document(&workflow(), &store, date());
        assert!(doc.contains("## Step 3: Third\n\n### Output\n\nreport\n"));
        assert!(!doc.contains("aggregated context"));
    }

    #[test]
    fn test_missing_results_are_marked() {
        let doc = render_document(&workflow(), &StepResultStore::new(), date());
        assert_eq!(doc.matches(NOT_COMPLETED_MARKER).count(), 4);
    }

    #[test]
    fn test_full_document_layout() {
        let workflow = WorkflowDefinition::new(
            "nda",
            "NDA",
            vec![
                StepDefinition::new("read", "Read", "p1", InputType::Text),
                StepDefinition::new("memo", "Memo", "p2", InputType::PreviousOutput),
            ],
        )
        .unwrap();
        let mut store = StepResultStore::new();
        store.upsert(StepResult::answered("read", "in1", "out1"));

        assert_eq!(
            render_document(&workflow, &store, date()),
            "# NDA\nExported: 2024-05-01\n\n---\n\
             \n## Step 1: Read\n\n### Input\n\nin1\n\n### Output\n\nout1\n\n---\n\
             \n## Step 2: Memo\n\n_(not completed)_\n\n---\n"
        );
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            export_file_name("Contract Review: Phase 1", date()),
            "contract-review-phase-1-2024-05-01.txt"
        );
        assert_eq!(export_file_name("!!!", date()), "workflow-2024-05-01.txt");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  M&A Due Diligence  "), "m-a-due-diligence");
        assert_eq!(slugify("NDA"), "nda");
    }

    #[test]
    fn test_write_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = export(&workflow(), &StepResultStore::new(), date());
        let path = artifact.write_to(dir.path().join("exports")).unwrap();

        assert_eq!(path.file_name().unwrap(), "contract-review-phase-1-2024-05-01.txt");
        assert_eq!(std::fs::read_to_string(path).unwrap(), artifact.content);
    }
}
