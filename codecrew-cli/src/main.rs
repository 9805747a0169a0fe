mod bootstrap;
mod logging;

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use codecrew_agent::agent::agent::AgentKind;
use codecrew_agent::agent::project_manager_agent::ProjectManagerAgent;
use codecrew_common::config::config::Config;
use codecrew_context::storage::storage::ContextStorage;
use codecrew_orchestrator::orchestrator::core::{Orchestrator, WorkflowRun};
use codecrew_orchestrator::orchestrator::workflow::WorkflowManager;

const PROJECTS_DIR: &str = "projects";

#[derive(Parser)]
#[command(name = "codecrew", version, about = "Multi-agent coding assistant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prepare the working directory: data/, logs/ and a .env scaffold
    Setup,
    /// Run one workflow over a task description
    Run {
        /// Workflow name (see `codecrew workflows`)
        #[arg(short, long, default_value = "standard")]
        workflow: String,
        /// Custom agent sequence, e.g. --agents Planner,Coder
        #[arg(long, value_delimiter = ',')]
        agents: Option<Vec<String>>,
        /// Write generated code under projects/<NAME>
        #[arg(short, long)]
        project: Option<String>,
        /// The task to work on
        #[arg(required = true)]
        task: Vec<String>,
    },
    /// Interactive session: one workflow run per input line
    Chat {
        #[arg(short, long, default_value = "standard")]
        workflow: String,
    },
    /// List the available workflows
    Workflows,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let base = std::env::current_dir().context("could not determine the working directory")?;

    match cli.command {
        Command::Setup => bootstrap::setup(&base),
        Command::Workflows => {
            for info in WorkflowManager::get_workflow_info() {
                println!("{:<12} {}: {}", info.name, info.title, info.description);
                println!("{:<12} agents: {}", "", info.agents.join(" -> "));
            }
            Ok(())
        }
        Command::Run { workflow, agents, project, task } => {
            let (mut manager, _guard) = build_manager(&base)?;
            let task = task.join(" ");

            let run = match agents {
                Some(names) => {
                    let sequence = parse_agent_sequence(&names)?;
                    manager.execute_custom(&sequence, &task).await?
                }
                None => manager.execute_workflow(&workflow, &task).await?,
            };

            print_run(&run);

            if let Some(name) = project {
                materialize_project(&base, &name, &run)?;
            }
            Ok(())
        }
        Command::Chat { workflow } => {
            let (mut manager, _guard) = build_manager(&base)?;
            chat_loop(&mut manager, &workflow).await
        }
    }
}

/// Launch path shared by `run` and `chat`: prepared directory, loaded
/// config, logging, and at least one configured provider. The returned
/// guard keeps the log file writer alive.
fn build_manager(base: &Path) -> Result<(WorkflowManager, tracing_appender::non_blocking::WorkerGuard)> {
    bootstrap::ensure_prepared(base)?;
    dotenvy::from_path(base.join(bootstrap::ENV_FILE)).ok();

    let config = Config::from_env()?;
    let guard = logging::init(config.log_level, &base.join(bootstrap::LOGS_DIR))?;

    if !config.any_provider_configured() {
        bail!(
            "no provider is configured: set ANTHROPIC_API_KEY or OPENAI_API_KEY in .env \
             (see `codecrew setup`)"
        );
    }

    let storage = ContextStorage::open(base.join(&config.db_path))?;
    let orchestrator = Orchestrator::new(config, storage)?;
    info!("orchestrator ready");
    Ok((WorkflowManager::new(orchestrator), guard))
}

fn parse_agent_sequence(names: &[String]) -> Result<Vec<AgentKind>> {
    names
        .iter()
        .map(|name| {
            AgentKind::from_name(name).with_context(|| format!("unknown agent {name:?}"))
        })
        .collect()
}

fn print_run(run: &WorkflowRun) {
    println!("{}", run.combined);
    println!(
        "---\ntokens used: {} (estimated cost {})",
        run.token_usage.total_tokens,
        run.token_usage.formatted_cost()
    );
}

fn materialize_project(base: &Path, name: &str, run: &WorkflowRun) -> Result<()> {
    // Prefer the coder's output; fall back to the combined report.
    let source = run
        .results
        .iter()
        .find(|r| r.agent == AgentKind::Coder)
        .map(|r| r.output.as_str())
        .unwrap_or(run.combined.as_str());

    let agent = ProjectManagerAgent::new(base.join(PROJECTS_DIR));
    let report = agent.materialize(name, source)?;

    println!("project written to {}", report.root.display());
    for path in &report.created {
        println!("  + {path}");
    }
    for error in &report.errors {
        println!("  ! {error}");
    }
    Ok(())
}

async fn chat_loop(manager: &mut WorkflowManager, workflow: &str) -> Result<()> {
    println!("codecrew chat: workflow {workflow:?}, type `exit` to leave");
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush().ok();

        let Some(line) = stdin.lock().lines().next() else {
            break;
        };
        let line = line.context("failed to read from stdin")?;
        let input = line.trim();

        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        match manager.execute_workflow(workflow, input).await {
            Ok(run) => print_run(&run),
            Err(e) => eprintln!("error: {e}"),
        }
    }

    Ok(())
}
