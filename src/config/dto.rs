//! TOML / JSON デシリアライズ用の DTO (Data Transfer Object)
//!
//! # 責務
//!
//! このモジュールは、TOML ファイルや LLM が生成した JSON からのデータ読み込み専用の
//! 構造体を提供します。DTO はバリデーション前の「生データ」を表現し、
//! ドメインモデルとは分離されています。
//!
//! ## 設計思想
//!
//! - **単一責務**: デシリアライズのみを担当
//! - **バリデーション前の状態**: 不正なデータも一旦受け入れる（全フィールド `Option`）
//! - **表記ゆれの吸収**: 生成されたワークフローは camelCase で返ることがあるため
//!   `alias` で両方を受け付ける
//!
//! ## 変換フロー
//!
//! ```text
//! TOML ファイル / 生成 JSON
//!   ↓ (デシリアライズ)
//! WorkflowDto / GeneratedWorkflowDto
//!   ↓ (TryFrom でバリデーション)
//! WorkflowDefinition (ドメインモデル)
//! ```

use serde::{Deserialize, Serialize};

/// ワークフロー DTO
///
/// TOML の `[workflow]` セクションと `[[steps]]` 配列をデシリアライズ/シリアライズします。
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WorkflowDto {
    /// ワークフローのメタデータ
    pub(crate) workflow: WorkflowMetadataDto,
    /// ステップの配列
    #[serde(default)]
    pub(crate) steps: Vec<WorkflowStepDto>,
}

/// ワークフローメタデータ DTO
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct WorkflowMetadataDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) category: Option<String>,

    #[serde(default, alias = "recommendedPersonas", skip_serializing_if = "Vec::is_empty")]
    pub(crate) recommended_personas: Vec<String>,
}

/// ワークフローステップ DTO
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct WorkflowStepDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,

    #[serde(default, alias = "promptInstruction", skip_serializing_if = "Option::is_none")]
    pub(crate) prompt_instruction: Option<String>,

    /// `"text"` / `"file"` / `"previous-output"`（未検証の文字列）
    #[serde(default, alias = "inputType", skip_serializing_if = "Option::is_none")]
    pub(crate) input_type: Option<String>,

    #[serde(default, alias = "inputInstructions", skip_serializing_if = "Option::is_none")]
    pub(crate) input_instructions: Option<String>,

    #[serde(default, alias = "isOptional", skip_serializing_if = "Option::is_none")]
    pub(crate) is_optional: Option<bool>,
}

/// LLM が生成するフラットな JSON 形式のワークフロー DTO
///
/// `{"title": ..., "steps": [...]}` のようにメタデータとステップが同じ階層に並びます。
#[derive(Debug, Deserialize)]
pub(crate) struct GeneratedWorkflowDto {
    #[serde(flatten)]
    pub(crate) metadata: WorkflowMetadataDto,
    #[serde(default)]
    pub(crate) steps: Vec<WorkflowStepDto>,
}

impl From<GeneratedWorkflowDto> for WorkflowDto {
    fn from(generated: GeneratedWorkflowDto) -> Self {
        Self {
            workflow: generated.metadata,
            steps: generated.steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_dto_accepts_camel_case() {
        let json = r#"{
            "title": "NDA review",
            "recommendedPersonas": ["in-house"],
            "steps": [
                {"id": "s1", "title": "Read", "promptInstruction": "Summarize", "inputType": "text", "isOptional": true}
            ]
        }"#;

        let dto: GeneratedWorkflowDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.metadata.title.as_deref(), Some("NDA review"));
        assert_eq!(dto.metadata.recommended_personas, vec!["in-house".to_string()]);
        assert_eq!(dto.steps[0].prompt_instruction.as_deref(), Some("Summarize"));
        assert_eq!(dto.steps[0].is_optional, Some(true));
        assert!(dto.metadata.id.is_none());
    }
}
