//! ワークフローステップの定義
//!
//! # 責務
//!
//! Workflowを構成するStepの定義体を提供するモジュール
//! アプリケーションに対して、[StepDefinition] と [InputType] を提供する。

use serde::{Deserialize, Serialize};

use super::dto::WorkflowStepDto;
use crate::error::ConfigError;

/// ステップの入力モード
///
/// ソースデータ上の `"file"` は `Text` と同じ扱いです（ファイル内容を
/// テキスト欄に読み込んでから送信するため）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputType {
    /// ユーザーが入力したテキストをそのまま送信
    Text,
    /// 前のステップまでの入出力を集約したコンテキストを送信
    PreviousOutput,
}

impl InputType {
    /// DTO 上の文字列表現を解析する
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "file" => Some(InputType::Text),
            "previous-output" | "previous_output" | "previousoutput" => {
                Some(InputType::PreviousOutput)
            }
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::PreviousOutput => "previous-output",
        }
    }
}

/// ワークフローステップ（ドメインモデル）
///
/// ワークフロー内の1つの処理単位を表します。
///
/// ## DTO との違い
///
/// - [`WorkflowStepDto`](super::dto::WorkflowStepDto): デシリアライズ専用
/// - [`StepDefinition`]: バリデーション済み、不変
#[derive(Debug, Clone, PartialEq)]
pub struct StepDefinition {
    id: String,
    title: String,
    description: String,
    prompt_instruction: String,
    input_type: InputType,
    input_instructions: Option<String>,
    is_optional: bool,
}

impl StepDefinition {
    /// 必須項目だけを指定してステップを生成
    ///
    /// # 例
    ///
    /// ```rust
    /// use legal_workflow::config::step::{InputType, StepDefinition};
    ///
    /// let step = StepDefinition::new("facts", "Facts", "Summarize the facts", InputType::Text)
    ///     .optional();
    /// assert!(step.is_optional());
    /// ```
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        prompt_instruction: impl Into<String>,
        input_type: InputType,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            prompt_instruction: prompt_instruction.into(),
            input_type,
            input_instructions: None,
            is_optional: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_input_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.input_instructions = Some(instructions.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
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

    pub fn prompt_instruction(&self) -> &str {
        &self.prompt_instruction
    }

    pub fn input_type(&self) -> InputType {
        self.input_type
    }

    pub fn input_instructions(&self) -> Option<&str> {
        self.input_instructions.as_deref()
    }

    pub fn is_optional(&self) -> bool {
        self.is_optional
    }
}

/// 空白のみの文字列を未指定として扱う
fn required(value: Option<String>, field: &str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Validation(format!(
            "ステップの {} は必須です",
            field
        ))),
    }
}

/// DTO からドメインモデルへの変換（読み込み方向）
///
/// バリデーションを実施し、不正なデータの場合は [`ConfigError::Validation`] を返します。
impl TryFrom<WorkflowStepDto> for StepDefinition {
    type Error = ConfigError;

    fn try_from(dto: WorkflowStepDto) -> Result<Self, Self::Error> {
        let id = required(dto.id, "id")?;
        let title = required(dto.title, "title")?;
        let prompt_instruction = required(dto.prompt_instruction, "prompt_instruction")?;

        let input_type = match dto.input_type.as_deref() {
            None => InputType::Text,
            Some(raw) => InputType::parse(raw).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "ステップ '{}' の input_type '{}' は不明です",
                    id, raw
                ))
            })?,
        };

        Ok(Self {
            id,
            title,
            description: dto.description.unwrap_or_default(),
            prompt_instruction,
            input_type,
            input_instructions: dto.input_instructions.filter(|s| !s.trim().is_empty()),
            is_optional: dto.is_optional.unwrap_or(false),
        })
    }
}

/// ドメインモデルから DTO への変換（書き込み方向）
///
/// バリデーション済みのドメインモデルから DTO を生成するため、
/// この変換は失敗しません（`From` トレイトを使用）。
impl From<&StepDefinition> for WorkflowStepDto {
    fn from(step: &StepDefinition) -> Self {
        Self {
            id: Some(step.id.clone()),
            title: Some(step.title.clone()),
            description: Some(step.description.clone()).filter(|d| !d.is_empty()),
            prompt_instruction: Some(step.prompt_instruction.clone()),
            input_type: Some(step.input_type.as_str().to_string()),
            input_instructions: step.input_instructions.clone(),
            is_optional: Some(step.is_optional),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(input_type: Option<&str>) -> WorkflowStepDto {
        WorkflowStepDto {
            id: Some("review".to_string()),
            title: Some("Review".to_string()),
            prompt_instruction: Some("Review the clause".to_string()),
            input_type: input_type.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_file_input_is_normalized_to_text() {
        let step = StepDefinition::try_from(dto(Some("file"))).unwrap();
        assert_eq!(step.input_type(), InputType::Text);
    }

    #[test]
    fn test_previous_output_variants() {
        for raw in ["previous-output", "previous_output", "previousOutput"] {
            let step = StepDefinition::try_from(dto(Some(raw))).unwrap();
            assert_eq!(step.input_type(), InputType::PreviousOutput, "{}", raw);
        }
    }

    #[test]
    fn test_missing_input_type_defaults_to_text() {
        let step = StepDefinition::try_from(dto(None)).unwrap();
        assert_eq!(step.input_type(), InputType::Text);
        assert!(!step.is_optional());
    }

    #[test]
    fn test_unknown_input_type_is_rejected() {
        let result = StepDefinition::try_from(dto(Some("audio")));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_blank_prompt_is_rejected() {
        let mut raw = dto(None);
        raw.prompt_instruction = Some("   ".to_string());
        assert!(StepDefinition::try_from(raw).is_err());
    }
}
