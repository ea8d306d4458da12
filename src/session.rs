//! 対話セッション
//!
//! 1行ずつ入力を読み取り、コマンドならエンジン操作に、それ以外はステップ入力として送信します。
//!
//! | 入力          | 動作                                   |
//! |---------------|----------------------------------------|
//! | `:skip`       | 現在のステップをスキップ               |
//! | `:back`       | 前のステップへ                         |
//! | `:next`       | 次のステップへ                         |
//! | `:goto N`     | N 番目（1始まり）のステップへ          |
//! | `:reset`      | 結果を消去して最初から                 |
//! | `:export`     | 結果をファイルに書き出す               |
//! | `:help`       | コマンド一覧                           |
//! | `:quit`       | 終了                                   |
//! | `@path`       | ファイルの内容を入力として送信         |
//! | その他        | 入力として送信                         |

use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;

use crate::config::step::InputType;
use crate::engine::{EngineError, EngineEvent, StepOutcome, WorkflowEngine};

const HELP: &str = "Commands: :skip  :back  :next  :goto N  :reset  :export  :help  :quit\n\
                    Prefix a path with @ to submit a file's contents.";

/// 1行の入力を解釈した結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Submit(String),
    SubmitFile(PathBuf),
    Skip,
    Back,
    Next,
    /// 0始まりのインデックス
    Goto(usize),
    Reset,
    Export,
    Help,
    Quit,
    Unknown(String),
}

/// 入力行を解釈する
pub fn parse_command(line: &str) -> SessionCommand {
    let trimmed = line.trim();

    if let Some(path) = trimmed.strip_prefix('@') {
        return SessionCommand::SubmitFile(PathBuf::from(path.trim()));
    }
    let Some(command) = trimmed.strip_prefix(':') else {
        return SessionCommand::Submit(line.trim_end_matches(['\r', '\n']).to_string());
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("skip"), None) => SessionCommand::Skip,
        (Some("back" | "prev"), None) => SessionCommand::Back,
        (Some("next"), None) => SessionCommand::Next,
        (Some("goto"), Some(n)) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => SessionCommand::Goto(n - 1),
            _ => SessionCommand::Unknown(trimmed.to_string()),
        },
        (Some("reset"), None) => SessionCommand::Reset,
        (Some("export"), None) => SessionCommand::Export,
        (Some("help"), None) => SessionCommand::Help,
        (Some("quit" | "exit" | "q"), None) => SessionCommand::Quit,
        _ => SessionCommand::Unknown(trimmed.to_string()),
    }
}

/// 対話セッション
pub struct Session {
    engine: WorkflowEngine,
    events: Receiver<EngineEvent>,
    export_dir: PathBuf,
}

impl Session {
    /// ワークフローが選択済みのエンジンからセッションを作る
    pub fn new(engine: WorkflowEngine, export_dir: impl Into<PathBuf>) -> Self {
        let events = engine.subscribe();
        Self {
            engine,
            events,
            export_dir: export_dir.into(),
        }
    }

    /// 入力が尽きるか `:quit` まで実行する
    pub async fn run<R>(&mut self, input: R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        self.print_current_step();

        while let Some(line) = lines.next_line().await? {
            self.drain_events();
            match parse_command(&line) {
                SessionCommand::Quit => break,
                SessionCommand::Help => println!("{}", HELP),
                SessionCommand::Unknown(command) => {
                    println!("Unknown command: {}\n{}", command, HELP);
                }
                SessionCommand::Submit(text) => self.submit(&text).await,
                SessionCommand::SubmitFile(path) => match tokio::fs::read_to_string(&path).await {
                    Ok(text) => self.submit(&text).await,
                    Err(e) => eprintln!("Could not read {}: {}", path.display(), e),
                },
                SessionCommand::Skip => match self.engine.skip_current_step() {
                    Ok(outcome) => {
                        println!("Step skipped.");
                        self.follow(outcome).await;
                    }
                    Err(e) => report(&e),
                },
                SessionCommand::Back => self.navigate(self.engine.go_to_prev_step()),
                SessionCommand::Next => self.navigate(self.engine.go_to_next_step()),
                SessionCommand::Goto(index) => self.navigate(self.engine.go_to_step(index)),
                SessionCommand::Reset => self.navigate(self.engine.reset_workflow()),
                SessionCommand::Export => self.export(),
            }
        }
        Ok(())
    }

    async fn submit(&mut self, text: &str) {
        let step_id = self.engine.current_step().map(|step| step.id().to_string());
        println!("Working...");
        match self.engine.submit_step_input(text).await {
            Ok(outcome) => {
                if let Some(result) = step_id.and_then(|id| self.engine.step_result_by_id(&id)) {
                    println!("\n{}\n", result.output);
                }
                self.follow(outcome).await;
            }
            Err(e) => report(&e),
        }
    }

    /// 自動進行を待ってから次のステップを表示する
    async fn follow(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::AdvanceScheduled { next_index } => {
                self.wait_for_advance(next_index).await;
                self.print_current_step();
            }
            StepOutcome::WorkflowComplete => {
                println!(
                    "Workflow complete ({:.0}%). Use :export to save the results or :quit to leave.",
                    self.engine.current_progress()
                );
            }
            StepOutcome::Recorded => self.print_current_step(),
        }
    }

    async fn wait_for_advance(&mut self, next_index: usize) {
        loop {
            match self.events.recv().await {
                Ok(EngineEvent::StepAdvanced { index }) if index == next_index => return,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return,
            }
        }
    }

    fn drain_events(&mut self) {
        while self.events.try_recv().is_ok() {}
    }

    fn navigate(&self, result: Result<(), EngineError>) {
        match result {
            Ok(()) => self.print_current_step(),
            Err(e) => report(&e),
        }
    }

    fn export(&self) {
        let written = self
            .engine
            .export_workflow_results()
            .and_then(|artifact| artifact.write_to(&self.export_dir).map_err(EngineError::from));
        match written {
            Ok(path) => println!("Exported to {}", path.display()),
            Err(e) => report(&e),
        }
    }

    fn print_current_step(&self) {
        let (Some(workflow), Some(step)) = (self.engine.active_workflow(), self.engine.current_step())
        else {
            return;
        };
        let index = self.engine.current_step_index();

        println!(
            "\n== {} | Step {}/{}: {}{} ({:.0}% complete)",
            workflow.title(),
            index + 1,
            workflow.steps().len(),
            step.title(),
            if step.is_optional() { " (optional)" } else { "" },
            self.engine.current_progress()
        );
        if !step.description().is_empty() {
            println!("{}", step.description());
        }
        if let Some(result) = self.engine.current_step_result() {
            if result.skipped {
                println!("[previously skipped]");
            } else {
                println!("[previous answer]\n{}", result.output);
            }
        }
        match step.input_type() {
            InputType::PreviousOutput => {
                println!("This step builds on the earlier results. Press Enter to run it.");
            }
            InputType::Text => {
                if let Some(instructions) = step.input_instructions() {
                    println!("{}", instructions);
                }
            }
        }
    }
}

fn report(err: &EngineError) {
    eprintln!("Error: {}", err);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_submitted() {
        assert_eq!(
            parse_command("The tenant shall pay rent.\n"),
            SessionCommand::Submit("The tenant shall pay rent.".to_string())
        );
        assert_eq!(parse_command(""), SessionCommand::Submit(String::new()));
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse_command(":skip"), SessionCommand::Skip);
        assert_eq!(parse_command("  :back "), SessionCommand::Back);
        assert_eq!(parse_command(":next"), SessionCommand::Next);
        assert_eq!(parse_command(":goto 3"), SessionCommand::Goto(2));
        assert_eq!(parse_command(":reset"), SessionCommand::Reset);
        assert_eq!(parse_command(":export"), SessionCommand::Export);
        assert_eq!(parse_command(":quit"), SessionCommand::Quit);
    }

    #[test]
    fn test_goto_requires_positive_number() {
        assert!(matches!(parse_command(":goto 0"), SessionCommand::Unknown(_)));
        assert!(matches!(parse_command(":goto x"), SessionCommand::Unknown(_)));
        assert!(matches!(parse_command(":goto"), SessionCommand::Unknown(_)));
    }

    #[test]
    fn test_file_input() {
        assert_eq!(
            parse_command("@ contracts/lease.txt"),
            SessionCommand::SubmitFile(PathBuf::from("contracts/lease.txt"))
        );
    }
}
