//! タスク記述からのワークフロー生成
//!
//! # 処理フロー
//!
//! ```text
//! タスク記述
//!   ↓ CompletionService（JSON で回答するよう指示）
//! 応答テキスト
//!   ↓ JSON オブジェクトの抽出（コードフェンスや前置きを許容）
//! GeneratedWorkflowDto
//!   ↓ 欠けた ID の補完 → TryFrom によるバリデーション
//! WorkflowDefinition
//! ```
//!
//! どの段階で失敗しても [`EngineError::MalformedGeneratedWorkflow`] を返します。
//! 生成結果はエンジンの状態には触れません（開始は呼び出し側が
//! [`WorkflowEngine::start_new_workflow`](crate::engine::WorkflowEngine::start_new_workflow) で行う）。

use std::sync::Arc;

use crate::config::dto::{GeneratedWorkflowDto, WorkflowDto};
use crate::config::workflow::WorkflowDefinition;
use crate::engine::EngineError;
use crate::engine::export::slugify;
use crate::provider::{ChatMessage, CompletionParams, CompletionService};

const GENERATION_TEMPERATURE: f32 = 0.4;

const SYSTEM_PROMPT: &str = "You design step-by-step workflows for legal professionals. \
Respond with a single JSON object and nothing else.";

const FORMAT_INSTRUCTIONS: &str = r#"Design a workflow of 3 to 6 steps for the task below.
Return JSON with this shape:
{
  "title": "short workflow title",
  "description": "one sentence",
  "category": "contracts | litigation | corporate | compliance | other",
  "steps": [
    {
      "id": "kebab-case-id",
      "title": "step title",
      "description": "what the step achieves",
      "promptInstruction": "instruction sent to the AI for this step",
      "inputType": "text | previous-output",
      "inputInstructions": "what the user should provide (text steps only)",
      "isOptional": false
    }
  ]
}
Use "previous-output" for steps that should build on earlier results."#;

/// ワークフロー生成器
pub struct WorkflowGenerator {
    service: Arc<dyn CompletionService>,
    max_tokens: u32,
}

impl WorkflowGenerator {
    pub fn new(service: Arc<dyn CompletionService>, max_tokens: u32) -> Self {
        Self {
            service,
            max_tokens,
        }
    }

    /// タスク記述からワークフローを生成する
    pub async fn generate(&self, task_description: &str) -> Result<WorkflowDefinition, EngineError> {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("{}\n\nTask: {}", FORMAT_INSTRUCTIONS, task_description.trim())),
        ];
        let params = CompletionParams {
            temperature: GENERATION_TEMPERATURE,
            max_tokens: self.max_tokens,
        };

        tracing::info!("requesting workflow generation");
        let response = self.service.complete(&messages, &params).await.map_err(|e| {
            tracing::warn!(error = %e, "workflow generation failed");
            EngineError::MalformedGeneratedWorkflow(e.to_string())
        })?;

        let workflow = parse_generated(&response.content)?;
        tracing::info!(
            workflow_id = %workflow.id(),
            steps = workflow.steps().len(),
            "workflow generated"
        );
        Ok(workflow)
    }
}

/// 生成テキストを検証済みのワークフローに変換する
pub fn parse_generated(text: &str) -> Result<WorkflowDefinition, EngineError> {
    let json = extract_json_object(text).ok_or_else(|| {
        EngineError::MalformedGeneratedWorkflow("応答に JSON オブジェクトが含まれていません".to_string())
    })?;

    let generated: GeneratedWorkflowDto = serde_json::from_str(json)
        .map_err(|e| EngineError::MalformedGeneratedWorkflow(e.to_string()))?;
    let mut dto = WorkflowDto::from(generated);

    if dto.workflow.id.as_deref().is_none_or(|id| id.trim().is_empty()) {
        let slug = dto.workflow.title.as_deref().map(slugify).unwrap_or_default();
        dto.workflow.id = Some(if slug.is_empty() { "generated-workflow".to_string() } else { slug });
    }
    for (index, step) in dto.steps.iter_mut().enumerate() {
        if step.id.as_deref().is_none_or(|id| id.trim().is_empty()) {
            step.id = Some(format!("step-{}", index + 1));
        }
    }

    Ok(WorkflowDefinition::try_from(dto)?)
}

/// 最初の `{` から最後の `}` までを取り出す
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::step::InputType;
    use crate::error::ProviderError;
    use crate::provider::ProviderResponse;
    use async_trait::async_trait;

    const GENERATED: &str = r#"Here is your workflow:
```json
{
  "title": "Employment Agreement Review",
  "steps": [
    {"title": "Summarize", "promptInstruction": "Summarize the agreement.", "inputType": "text"},
    {"id": "risks", "title": "Risks", "promptInstruction": "List risks.", "inputType": "previous-output", "isOptional": true}
  ]
}
```"#;

    struct FixedService(Result<&'static str, ()>);

    #[async_trait]
    impl CompletionService for FixedService {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _params: &CompletionParams,
        ) -> Result<ProviderResponse, ProviderError> {
            match self.0 {
                Ok(text) => Ok(ProviderResponse::from_text(text)),
                Err(()) => Err(ProviderError::RateLimitExceeded),
            }
        }
    }

    #[test]
    fn test_parse_fenced_json_and_fill_ids() {
        let workflow = parse_generated(GENERATED).unwrap();

        assert_eq!(workflow.id(), "employment-agreement-review");
        assert_eq!(workflow.steps()[0].id(), "step-1");
        assert_eq!(workflow.steps()[1].id(), "risks");
        assert_eq!(workflow.steps()[1].input_type(), InputType::PreviousOutput);
        assert!(workflow.steps()[1].is_optional());
    }

    #[test]
    fn test_missing_steps_is_malformed() {
        let err = parse_generated(r#"{"title": "Empty"}"#).unwrap_err();
        assert!(matches!(err, EngineError::MalformedGeneratedWorkflow(_)));
    }

    #[test]
    fn test_unknown_input_type_is_malformed() {
        let text = r#"{"title": "T", "steps": [{"title": "S", "promptInstruction": "p", "inputType": "audio"}]}"#;
        assert!(matches!(
            parse_generated(text),
            Err(EngineError::MalformedGeneratedWorkflow(_))
        ));
    }

    #[test]
    fn test_non_json_is_malformed() {
        assert!(matches!(
            parse_generated("I cannot help with that."),
            Err(EngineError::MalformedGeneratedWorkflow(_))
        ));
        assert!(matches!(
            parse_generated("{ not json }"),
            Err(EngineError::MalformedGeneratedWorkflow(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_via_service() {
        let generator = WorkflowGenerator::new(Arc::new(FixedService(Ok(GENERATED))), 1000);
        let workflow = generator.generate("Review an employment agreement").await.unwrap();
        assert_eq!(workflow.title(), "Employment Agreement Review");
    }

    #[tokio::test]
    async fn test_provider_failure_is_malformed() {
        let generator = WorkflowGenerator::new(Arc::new(FixedService(Err(()))), 1000);
        let err = generator.generate("anything").await.unwrap_err();
        assert!(matches!(err, EngineError::MalformedGeneratedWorkflow(_)));
    }
}
