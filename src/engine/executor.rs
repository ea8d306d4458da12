//! ワークフロー実行エンジン
//!
//! # 責務
//!
//! このモジュールは、ステップ単位で対話的にワークフローを進める [`WorkflowEngine`] を提供します。
//! アクティブなワークフロー、現在のステップ位置、結果ストアを専有し、
//! 送信・スキップ・移動・進捗計算・エクスポートを制御します。
//! [`CompletionService`] を呼び出すのはこのエンジンだけです。
//!
//! # 実行フロー（送信時）
//!
//! 1. 現在のステップを取得
//! 2. 入力を決定（`previous-output` なら前ステップのコンテキストを集約）
//! 3. ビジーガードを取得（同時送信は [`EngineError::Busy`]）
//! 4. プロンプトを調整し、CompletionService を呼び出す
//! 5. 成功時は結果を記録、失敗時は何も記録せずエラーを通知
//! 6. ビジーガードを解放
//! 7. 成功時のみ、最後のステップでなければ自動で次へ進む（待機時間付き・キャンセル可能）
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
//!     let settings = Settings::default();
//!     let engine = WorkflowEngine::new(
//!         Catalog::builtin()?,
//!         create_provider(&settings.provider),
//!         settings.persona.clone(),
//!         settings.engine.clone(),
//!     );
//!
//!     engine.select_workflow("contract-review")?;
//!     engine.submit_step_input("This Agreement is made between ...").await?;
//!     println!("Progress: {:.0}%", engine.current_progress());
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;

use crate::catalog::Catalog;
use crate::config::settings::{EngineSettings, PromptProfile};
use crate::config::step::{InputType, StepDefinition};
use crate::config::workflow::WorkflowDefinition;
use crate::engine::adaptation::adapt;
use crate::engine::context::aggregate_or_sentinel;
use crate::engine::export::{ExportArtifact, export};
use crate::engine::result::{EngineError, EngineEvent, RunPhase, StepOutcome};
use crate::engine::store::{StepResult, StepResultStore};
use crate::error::ProviderError;
use crate::provider::{ChatMessage, CompletionParams, CompletionService};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// ワークフロー実行エンジン
///
/// 1インスタンス = 1実行です。`Clone` は同じ実行状態を共有するハンドルを返します
/// （自動進行タスクが状態を更新するために使用）。
#[derive(Clone)]
pub struct WorkflowEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    catalog: Catalog,
    service: Arc<dyn CompletionService>,
    profile: PromptProfile,
    settings: EngineSettings,
    state: Mutex<RunState>,
    busy: AtomicBool,
    events: broadcast::Sender<EngineEvent>,
}

/// 実行状態（エンジンが専有）
struct RunState {
    workflow: Option<Arc<WorkflowDefinition>>,
    current_index: usize,
    results: StepResultStore,
    phase: RunPhase,
    /// 送信中のステップ
    submitting: Option<usize>,
    /// 選択・リセットのたびに増える世代番号
    epoch: u64,
    pending_advance: Option<AbortHandle>,
    /// 自動進行の予約番号（取り消しのたびに増える）
    advance_token: u64,
}

impl RunState {
    fn cancel_pending_advance(&mut self) {
        // 起床済みのタスクも番号の不一致で無効になる
        self.advance_token += 1;
        if let Some(handle) = self.pending_advance.take() {
            handle.abort();
            tracing::debug!("pending auto-advance cancelled");
        }
    }

    fn active(&self) -> Result<Arc<WorkflowDefinition>, EngineError> {
        self.workflow.clone().ok_or(EngineError::NoActiveWorkflow)
    }
}

/// ビジーフラグを保持し、スコープを抜けると必ず解放する
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// 送信前に確定させた値
struct PreparedSubmission {
    workflow: Arc<WorkflowDefinition>,
    index: usize,
    step: StepDefinition,
    context_input: String,
    epoch: u64,
}

impl WorkflowEngine {
    /// 新しいエンジンを生成
    ///
    /// # 引数
    ///
    /// - `catalog`: 選択可能なワークフロー
    /// - `service`: 補完サービス
    /// - `profile`: プロンプト調整に使うペルソナ設定
    /// - `settings`: 自動進行の待機時間など
    pub fn new(
        catalog: Catalog,
        service: Arc<dyn CompletionService>,
        profile: PromptProfile,
        settings: EngineSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(EngineInner {
                catalog,
                service,
                profile,
                settings,
                state: Mutex::new(RunState {
                    workflow: None,
                    current_index: 0,
                    results: StepResultStore::new(),
                    phase: RunPhase::NoActiveWorkflow,
                    submitting: None,
                    epoch: 0,
                    pending_advance: None,
                    advance_token: 0,
                }),
                busy: AtomicBool::new(false),
                events,
            }),
        }
    }

    /// イベントを購読する
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: EngineEvent) {
        // 購読者がいない場合の送信失敗は無視してよい
        let _ = self.inner.events.send(event);
    }

    fn acquire(&self) -> Result<BusyGuard<'_>, EngineError> {
        self.inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                tracing::warn!("rejected: previous submission still in progress");
                EngineError::Busy
            })?;
        Ok(BusyGuard {
            flag: &self.inner.busy,
        })
    }

    // ------------------------------------------------------------------
    // ワークフローの選択とリセット
    // ------------------------------------------------------------------

    /// カタログからワークフローを選択し、最初から開始する
    ///
    /// 同じワークフローを再選択した場合も進捗は破棄されます。
    pub fn select_workflow(&self, workflow_id: &str) -> Result<(), EngineError> {
        let workflow = self.inner.catalog.get(workflow_id).ok_or_else(|| {
            tracing::warn!(workflow_id, "unknown workflow");
            EngineError::UnknownWorkflow(workflow_id.to_string())
        })?;
        self.begin_run(workflow);
        Ok(())
    }

    /// 外部で構築したワークフロー（生成されたもの等）を開始する
    pub fn start_new_workflow(&self, workflow: WorkflowDefinition) {
        self.begin_run(Arc::new(workflow));
    }

    fn begin_run(&self, workflow: Arc<WorkflowDefinition>) {
        let workflow_id = workflow.id().to_string();
        {
            let mut state = self.lock();
            state.cancel_pending_advance();
            state.workflow = Some(workflow);
            state.current_index = 0;
            state.results.clear();
            state.submitting = None;
            state.phase = RunPhase::AwaitingStepInput(0);
            state.epoch += 1;
        }
        tracing::info!(workflow_id = %workflow_id, "workflow selected");
        self.emit(EngineEvent::WorkflowSelected { workflow_id });
    }

    /// 結果を消去して最初のステップに戻る（ワークフローはそのまま）
    pub fn reset_workflow(&self) -> Result<(), EngineError> {
        let workflow_id = {
            let mut state = self.lock();
            let workflow = state.active()?;
            state.cancel_pending_advance();
            state.results.clear();
            state.current_index = 0;
            state.submitting = None;
            state.phase = RunPhase::AwaitingStepInput(0);
            state.epoch += 1;
            workflow.id().to_string()
        };
        tracing::info!(workflow_id = %workflow_id, "workflow reset");
        self.emit(EngineEvent::WorkflowReset { workflow_id });
        Ok(())
    }

    // ------------------------------------------------------------------
    // ステップ移動
    // ------------------------------------------------------------------

    /// 指定したステップへ移動する
    pub fn go_to_step(&self, index: usize) -> Result<(), EngineError> {
        let mut state = self.lock();
        let workflow = state.active()?;
        let len = workflow.steps().len();
        if index >= len {
            tracing::debug!(index, len, "navigation target out of range");
            return Err(EngineError::InvalidStepIndex { index, len });
        }
        Self::move_to(&mut state, index);
        Ok(())
    }

    /// 次のステップへ移動する（最後のステップでは何もしない）
    pub fn go_to_next_step(&self) -> Result<(), EngineError> {
        let mut state = self.lock();
        let workflow = state.active()?;
        if state.current_index < workflow.last_index() {
            let next = state.current_index + 1;
            Self::move_to(&mut state, next);
        }
        Ok(())
    }

    /// 前のステップへ移動する（最初のステップでは何もしない）
    pub fn go_to_prev_step(&self) -> Result<(), EngineError> {
        let mut state = self.lock();
        state.active()?;
        if state.current_index > 0 {
            let prev = state.current_index - 1;
            Self::move_to(&mut state, prev);
        }
        Ok(())
    }

    fn move_to(state: &mut RunState, index: usize) {
        state.cancel_pending_advance();
        state.current_index = index;
        state.phase = RunPhase::AwaitingStepInput(index);
        tracing::debug!(index, "moved to step");
    }

    // ------------------------------------------------------------------
    // 送信とスキップ
    // ------------------------------------------------------------------

    /// 現在のステップに入力を送信する
    ///
    /// `previous-output` ステップでは `raw_input` は AI に送られず、
    /// 前ステップのコンテキストが使われます。
    ///
    /// # エラー
    ///
    /// - [`EngineError::NoActiveWorkflow`] - ワークフロー未選択
    /// - [`EngineError::Busy`] - 前の送信が未完了
    /// - [`EngineError::CompletionFailure`] - 補完失敗（結果は記録されず、位置も変わらない）
    /// - [`EngineError::RunSuperseded`] - 応答待ちの間にリセット・再選択された
    pub async fn submit_step_input(&self, raw_input: &str) -> Result<StepOutcome, EngineError> {
        let guard = self.acquire()?;
        let prepared = self.prepare_submission(raw_input)?;
        let step_id = prepared.step.id().to_string();

        let adapted = adapt(
            prepared.step.prompt_instruction(),
            &self.inner.profile,
            prepared.step.input_type(),
        );
        let messages = build_messages(
            &prepared.workflow,
            &prepared.step,
            &adapted.prompt,
            &prepared.context_input,
        );
        let params = CompletionParams {
            temperature: adapted.temperature,
            max_tokens: self.inner.settings.max_tokens,
        };

        tracing::info!(
            workflow_id = %prepared.workflow.id(),
            step_id = %step_id,
            index = prepared.index,
            temperature = params.temperature,
            "submitting step"
        );

        let response = self
            .inner
            .service
            .complete(&messages, &params)
            .await
            .and_then(|response| {
                if response.content.trim().is_empty() {
                    Err(ProviderError::InvalidResponse(
                        "No content in response".to_string(),
                    ))
                } else {
                    Ok(response)
                }
            });

        let mut state = self.lock();
        if state.epoch != prepared.epoch {
            drop(state);
            tracing::warn!(step_id = %step_id, "run was reset while waiting for completion");
            return Err(EngineError::RunSuperseded);
        }
        state.submitting = None;

        let response = match response {
            Ok(response) => response,
            Err(source) => {
                state.phase = RunPhase::AwaitingStepInput(state.current_index);
                drop(state);
                drop(guard);
                tracing::warn!(step_id = %step_id, error = %source, "step completion failed");
                self.emit(EngineEvent::StepFailed {
                    step_id: step_id.clone(),
                    message: source.to_string(),
                });
                return Err(EngineError::CompletionFailure { step_id, source });
            }
        };

        tracing::info!(
            step_id = %step_id,
            tokens = response.token_usage.total(),
            model = %response.model,
            "step completed"
        );
        state
            .results
            .upsert(StepResult::answered(&step_id, raw_input, response.content));
        self.emit(EngineEvent::StepCompleted { step_id });

        drop(guard);
        Ok(self.after_step_recorded(&mut state, &prepared.workflow, prepared.index))
    }

    fn prepare_submission(&self, raw_input: &str) -> Result<PreparedSubmission, EngineError> {
        let mut state = self.lock();
        let workflow = state.active()?;
        state.cancel_pending_advance();

        let index = state.current_index;
        let step = workflow.steps()[index].clone();
        let context_input = match step.input_type() {
            InputType::PreviousOutput => aggregate_or_sentinel(&workflow, index, &state.results),
            InputType::Text => raw_input.to_string(),
        };

        state.submitting = Some(index);
        state.phase = RunPhase::SubmittingStep(index);

        Ok(PreparedSubmission {
            workflow,
            index,
            step,
            context_input,
            epoch: state.epoch,
        })
    }

    /// 現在のステップをスキップする
    ///
    /// `is_optional` でないステップもスキップできます（制限は呼び出し側の責務）。
    pub fn skip_current_step(&self) -> Result<StepOutcome, EngineError> {
        let guard = self.acquire()?;
        let mut state = self.lock();
        let workflow = state.active()?;
        state.cancel_pending_advance();

        let index = state.current_index;
        let step = &workflow.steps()[index];
        if !step.is_optional() {
            tracing::debug!(step_id = %step.id(), "skipping a step that is not marked optional");
        }

        state.results.upsert(StepResult::skipped(step.id()));
        tracing::info!(step_id = %step.id(), index, "step skipped");
        self.emit(EngineEvent::StepSkipped {
            step_id: step.id().to_string(),
        });

        drop(guard);
        Ok(self.after_step_recorded(&mut state, &workflow, index))
    }

    /// 記録後の遷移（完了判定と自動進行の予約）
    fn after_step_recorded(
        &self,
        state: &mut RunState,
        workflow: &WorkflowDefinition,
        index: usize,
    ) -> StepOutcome {
        if state.current_index != index {
            // 応答待ちの間に別のステップへ移動していた
            state.phase = RunPhase::AwaitingStepInput(state.current_index);
            return StepOutcome::Recorded;
        }

        if index >= workflow.last_index() {
            state.phase = RunPhase::WorkflowComplete;
            tracing::info!(workflow_id = %workflow.id(), "workflow complete");
            self.emit(EngineEvent::WorkflowCompleted {
                workflow_id: workflow.id().to_string(),
            });
            return StepOutcome::WorkflowComplete;
        }

        state.phase = RunPhase::StepCompleted(index);
        let next_index = index + 1;
        let delay = self.inner.settings.auto_advance_delay();

        let runtime = tokio::runtime::Handle::try_current();
        match runtime {
            Ok(handle) if !delay.is_zero() => {
                let engine = self.clone();
                let epoch = state.epoch;
                let token = state.advance_token;
                let task = handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    engine.complete_scheduled_advance(epoch, token, index, next_index);
                });
                state.pending_advance = Some(task.abort_handle());
                tracing::debug!(next_index, delay_ms = delay.as_millis() as u64, "auto-advance scheduled");
            }
            _ => {
                state.current_index = next_index;
                state.phase = RunPhase::AwaitingStepInput(next_index);
                self.emit(EngineEvent::StepAdvanced { index: next_index });
            }
        }

        StepOutcome::AdvanceScheduled { next_index }
    }

    /// 予約された自動進行を実行（途中で状態が変わっていれば何もしない）
    fn complete_scheduled_advance(&self, epoch: u64, token: u64, from: usize, to: usize) {
        let mut state = self.lock();
        if state.advance_token != token {
            tracing::debug!(from, to, "auto-advance skipped: cancelled");
            return;
        }
        state.pending_advance = None;
        if state.epoch != epoch || state.current_index != from {
            tracing::debug!(from, to, "auto-advance skipped: run state changed");
            return;
        }
        state.current_index = to;
        state.phase = RunPhase::AwaitingStepInput(to);
        drop(state);
        tracing::debug!(index = to, "auto-advanced");
        self.emit(EngineEvent::StepAdvanced { index: to });
    }

    // ------------------------------------------------------------------
    // 読み取り
    // ------------------------------------------------------------------

    pub fn active_workflow(&self) -> Option<Arc<WorkflowDefinition>> {
        self.lock().workflow.clone()
    }

    pub fn current_step_index(&self) -> usize {
        self.lock().current_index
    }

    pub fn current_step(&self) -> Option<StepDefinition> {
        let state = self.lock();
        let workflow = state.workflow.as_ref()?;
        workflow.steps().get(state.current_index).cloned()
    }

    pub fn current_step_result(&self) -> Option<StepResult> {
        let state = self.lock();
        let workflow = state.workflow.as_ref()?;
        let step = workflow.steps().get(state.current_index)?;
        state.results.get(step.id()).cloned()
    }

    pub fn step_result_by_id(&self, step_id: &str) -> Option<StepResult> {
        self.lock().results.get(step_id).cloned()
    }

    /// 結果ストアの複製
    pub fn step_results(&self) -> StepResultStore {
        self.lock().results.clone()
    }

    /// 完了ステップの割合（0〜100）
    pub fn current_progress(&self) -> f64 {
        let state = self.lock();
        match &state.workflow {
            Some(workflow) => {
                state.results.completed_count() as f64 / workflow.steps().len() as f64 * 100.0
            }
            None => 0.0,
        }
    }

    /// CompletionService の応答待ちかどうか
    pub fn is_loading(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> RunPhase {
        let state = self.lock();
        match state.submitting {
            Some(index) if self.is_loading() => RunPhase::SubmittingStep(index),
            _ => state.phase,
        }
    }

    // ------------------------------------------------------------------
    // エクスポート
    // ------------------------------------------------------------------

    /// 今日の日付で結果をエクスポートする
    pub fn export_workflow_results(&self) -> Result<ExportArtifact, EngineError> {
        self.export_workflow_results_on(chrono::Local::now().date_naive())
    }

    /// 指定日付で結果をエクスポートする
    pub fn export_workflow_results_on(&self, date: NaiveDate) -> Result<ExportArtifact, EngineError> {
        let state = self.lock();
        let workflow = state.active()?;
        let artifact = export(&workflow, &state.results, date);
        tracing::info!(file_name = %artifact.file_name, "workflow results exported");
        Ok(artifact)
    }
}

/// system メッセージ（ワークフロー名とステップ名）と user メッセージを組み立てる
fn build_messages(
    workflow: &WorkflowDefinition,
    step: &StepDefinition,
    adapted_prompt: &str,
    context_input: &str,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "You are an AI assistant helping a legal professional with the workflow \"{}\". \
             Current step: \"{}\".",
            workflow.title(),
            step.title()
        )),
        ChatMessage::user(format!("{}\n\n{}", adapted_prompt, context_input)),
    ]
}
