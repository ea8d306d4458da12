//! Workflow 定義の読み込みと管理を行うモジュール
//!
//! # 責務
//!
//! このモジュールは、法務ワークフローを TOML 形式で定義し、
//! それを Rust の型として扱うための機能を提供します。
//!
//! ## 主な機能
//!
//! - **TOML パース**: `workflows/` ディレクトリ内の TOML ファイルを読み込み、
//!   [`WorkflowDefinition`] 構造体に変換
//! - **バリデーション**: ステップが空でないこと、ステップ ID が一意であることを保証
//! - **シリアライズ**: 生成されたワークフローを TOML として保存可能
//!
//! ## 使用例
//!
//! ```toml
//! [workflow]
//! id = "contract-review"
//! title = "Contract Review"
//! description = "Review a commercial contract"
//! category = "contracts"
//!
//! [[steps]]
//! id = "summary"
//! title = "Summarize"
//! prompt_instruction = "Summarize the key terms of this contract."
//! input_type = "text"
//!
//! [[steps]]
//! id = "risks"
//! title = "Risk Analysis"
//! prompt_instruction = "Identify the risks in the terms above."
//! input_type = "previous-output"
//! ```

use std::collections::HashSet;
use std::path::Path;

use super::dto::{WorkflowDto, WorkflowMetadataDto, WorkflowStepDto};
use super::step::StepDefinition;
use crate::error::ConfigError;

/// ワークフロー定義（ドメインモデル）
///
/// バリデーション済みの状態を保証します。
/// `steps` は空でなく、ステップ ID はワークフロー内で一意です。
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDefinition {
    id: String,
    title: String,
    description: String,
    category: String,
    steps: Vec<StepDefinition>,
    recommended_personas: Vec<String>,
}

impl WorkflowDefinition {
    /// ステップ列からワークフローを生成（バリデーション付き）
    ///
    /// # エラー
    ///
    /// - ステップが空の場合
    /// - ステップ ID が重複している場合
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        steps: Vec<StepDefinition>,
    ) -> Result<Self, ConfigError> {
        let workflow = Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category: String::new(),
            steps,
            recommended_personas: Vec::new(),
        };
        workflow.validate()?;
        Ok(workflow)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// TOML ファイルからワークフローを読み込む
    ///
    /// # 処理フロー
    ///
    /// 1. ファイル読み込み
    /// 2. TOML デシリアライズ → [`WorkflowDto`]
    /// 3. バリデーション & 変換 → [`WorkflowDefinition`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// TOML 文字列からワークフローを読み込む
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let dto: WorkflowDto = toml::from_str(toml)?;
        Self::try_from(dto)
    }

    /// ワークフローを TOML 文字列に変換
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let dto = WorkflowDto::from(self);
        Ok(toml::to_string(&dto)?)
    }

    /// ワークフローを TOML ファイルに保存
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn recommended_personas(&self) -> &[String] {
        &self.recommended_personas
    }

    /// ID でステップを検索
    pub fn step(&self, step_id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|step| step.id() == step_id)
    }

    /// 最後のステップのインデックス
    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::Validation("ワークフローの id は必須です".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "ワークフロー '{}' の title は必須です",
                self.id
            )));
        }
        if self.steps.is_empty() {
            return Err(ConfigError::Validation(format!(
                "ワークフロー '{}' にステップがありません",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.id()) {
                return Err(ConfigError::Validation(format!(
                    "ワークフロー '{}' のステップ ID '{}' が重複しています",
                    self.id,
                    step.id()
                )));
            }
        }
        Ok(())
    }
}

/// DTO からドメインモデルへの変換（読み込み方向）
///
/// # 処理フロー
///
/// 1. 各フィールドのバリデーション
/// 2. ステップの変換（`WorkflowStepDto` → `StepDefinition`）
/// 3. 不変条件（非空・ID 一意）の検証
impl TryFrom<WorkflowDto> for WorkflowDefinition {
    type Error = ConfigError;

    fn try_from(dto: WorkflowDto) -> Result<Self, Self::Error> {
        let steps = dto
            .steps
            .into_iter()
            .map(StepDefinition::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let metadata = dto.workflow;
        let workflow = Self {
            id: metadata.id.unwrap_or_default().trim().to_string(),
            title: metadata.title.unwrap_or_default().trim().to_string(),
            description: metadata.description.unwrap_or_default(),
            category: metadata.category.unwrap_or_default(),
            steps,
            recommended_personas: metadata.recommended_personas,
        };
        workflow.validate()?;
        Ok(workflow)
    }
}

/// ドメインモデルから DTO への変換（書き込み方向）
impl From<&WorkflowDefinition> for WorkflowDto {
    fn from(workflow: &WorkflowDefinition) -> Self {
        let non_empty = |s: &str| Some(s.to_string()).filter(|s| !s.is_empty());
        Self {
            workflow: WorkflowMetadataDto {
                id: Some(workflow.id.clone()),
                title: Some(workflow.title.clone()),
                description: non_empty(&workflow.description),
                category: non_empty(&workflow.category),
                recommended_personas: workflow.recommended_personas.clone(),
            },
            steps: workflow.steps.iter().map(WorkflowStepDto::from).collect(),
        }
    }
}
