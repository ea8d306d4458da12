use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use legal_workflow::catalog::Catalog;
use legal_workflow::config::{InputType, Settings, WorkflowDefinition};
use legal_workflow::engine::WorkflowEngine;
use legal_workflow::generator::WorkflowGenerator;
use legal_workflow::logging;
use legal_workflow::provider::create_provider;
use legal_workflow::session::Session;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Debug, Parser)]
#[command(name = "legal-workflow", version, about = "Run AI-assisted legal workflows step by step")]
struct Cli {
    /// 設定ファイル（TOML）
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// 追加で読み込むワークフロー定義のディレクトリ
    #[arg(long, global = true, value_name = "DIR")]
    workflows: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 利用可能なワークフローを一覧表示
    List,
    /// ワークフローのステップを表示
    Show {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// ワークフローを対話的に実行
    Run {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(long, value_name = "DIR", default_value = "exports")]
        export_dir: PathBuf,
    },
    /// タスク記述からワークフローを生成
    Generate {
        #[arg(value_name = "DESCRIPTION")]
        description: String,
        /// 生成したワークフローを TOML で保存
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
        /// 生成後そのまま実行
        #[arg(long)]
        run: bool,
        #[arg(long, value_name = "DIR", default_value = "exports")]
        export_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load_or_default(cli.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = match logging::init(&settings.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match execute(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli, settings: Settings) -> CliResult {
    let mut catalog = Catalog::builtin()?;
    if let Some(dir) = &cli.workflows {
        let loaded = catalog.load_dir(dir)?;
        tracing::info!(count = loaded, dir = %dir.display(), "user workflows loaded");
    }

    match cli.command {
        Command::List => {
            for workflow in catalog.list() {
                println!("{:<24} {} [{}]", workflow.id(), workflow.title(), workflow.category());
                if !workflow.description().is_empty() {
                    println!("{:<24} {}", "", workflow.description());
                }
            }
            Ok(())
        }
        Command::Show { id } => {
            let workflow = catalog
                .get(&id)
                .ok_or_else(|| format!("ワークフロー '{}' が見つかりません", id))?;
            print_workflow(&workflow);
            Ok(())
        }
        Command::Run { id, export_dir } => {
            let engine = build_engine(catalog, &settings);
            engine.select_workflow(&id)?;
            run_session(engine, export_dir).await
        }
        Command::Generate {
            description,
            save,
            run,
            export_dir,
        } => {
            let service = create_provider(&settings.provider);
            let generator = WorkflowGenerator::new(service.clone(), settings.engine.max_tokens);
            let workflow = generator.generate(&description).await?;
            print_workflow(&workflow);

            if let Some(path) = &save {
                workflow.to_file(path)?;
                println!("Saved to {}", path.display());
            }
            if run {
                let engine = WorkflowEngine::new(
                    catalog,
                    service,
                    settings.persona.clone(),
                    settings.engine.clone(),
                );
                engine.start_new_workflow(workflow);
                run_session(engine, export_dir).await?;
            }
            Ok(())
        }
    }
}

fn build_engine(catalog: Catalog, settings: &Settings) -> WorkflowEngine {
    WorkflowEngine::new(
        catalog,
        create_provider(&settings.provider),
        settings.persona.clone(),
        settings.engine.clone(),
    )
}

async fn run_session(engine: WorkflowEngine, export_dir: PathBuf) -> CliResult {
    let mut session = Session::new(engine, export_dir);
    session.run(BufReader::new(tokio::io::stdin())).await?;
    Ok(())
}

fn print_workflow(workflow: &WorkflowDefinition) {
    println!("{} ({})", workflow.title(), workflow.id());
    if !workflow.description().is_empty() {
        println!("{}", workflow.description());
    }
    if !workflow.recommended_personas().is_empty() {
        println!("Recommended for: {}", workflow.recommended_personas().join(", "));
    }
    println!();
    for (index, step) in workflow.steps().iter().enumerate() {
        let input = match step.input_type() {
            InputType::Text => "text",
            InputType::PreviousOutput => "previous output",
        };
        println!(
            "{:>2}. {} [{}]{}",
            index + 1,
            step.title(),
            input,
            if step.is_optional() { " (optional)" } else { "" }
        );
        if !step.description().is_empty() {
            println!("    {}", step.description());
        }
    }
}
