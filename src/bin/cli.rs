use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use agent_orchestrator::prelude::*;
use agent_orchestrator::StepStatus;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "orchestrator.yaml";

#[derive(Parser)]
#[command(name = "agent-orchestrator")]
#[command(about = "Run tasks, batches and workflows against registered agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the orchestrator config (defaults to ./orchestrator.yaml if present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered agents
    Agents,

    /// Show per-agent status
    Status,

    /// Run a single task
    Run {
        /// Agent type to run
        #[arg(value_name = "TYPE")]
        agent_type: String,

        /// Task text
        #[arg(value_name = "TASK")]
        task: String,

        /// Project the task belongs to
        #[arg(short, long)]
        project: Option<String>,

        /// Caller-supplied task id
        #[arg(long)]
        task_id: Option<String>,

        /// JSON context object passed to the agent
        #[arg(long, value_name = "JSON")]
        context: Option<String>,
    },

    /// Run a YAML list of task requests concurrently
    Batch {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Run a workflow file, or every workflow in a directory
    Workflow {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Validate a workflow file or directory without running it
    Validate {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "agent_orchestrator=debug"
    } else {
        "agent_orchestrator=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let json = cli.json;
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Agents => list_agents(&orchestrator(config).await?, json).await,
        Commands::Status => show_status(&orchestrator(config).await?, json).await,
        Commands::Run {
            agent_type,
            task,
            project,
            task_id,
            context,
        } => {
            let mut request = TaskRequest::new(agent_type, task);
            request.project_id = project;
            request.task_id = task_id;
            if let Some(raw) = context {
                request.context = Some(serde_json::from_str(&raw)?);
            }
            run_single(&orchestrator(config).await?, request, json).await
        }
        Commands::Batch { file } => run_batch(&orchestrator(config).await?, &file, json).await,
        Commands::Workflow { path } => {
            run_workflows(&orchestrator(config).await?, &path, json).await
        }
        Commands::Validate { path } => validate(&path, config),
    }
}

async fn orchestrator(config: Option<&Path>) -> anyhow::Result<Orchestrator> {
    let config = load_config(config)?;
    let registry = Arc::new(config.build_registry().await?);
    if registry.is_empty().await {
        tracing::warn!("No agents registered");
    }
    Ok(Orchestrator::with_registry(registry))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<OrchestratorConfig> {
    match path {
        Some(path) => Ok(OrchestratorConfig::load(path)?),
        None if Path::new(DEFAULT_CONFIG).exists() => Ok(OrchestratorConfig::load(DEFAULT_CONFIG)?),
        None => {
            tracing::debug!("No config file, using defaults");
            Ok(OrchestratorConfig::default())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn list_agents(orchestrator: &Orchestrator, json: bool) -> anyhow::Result<bool> {
    let agents = orchestrator.list_executors().await;

    if json {
        print_json(&agents)?;
        return Ok(true);
    }

    if agents.is_empty() {
        println!("No agents registered");
        return Ok(true);
    }

    println!("Agents:\n");
    for agent in &agents {
        let role = if agent.role.is_empty() {
            String::new()
        } else {
            format!(" [{}]", agent.role)
        };
        println!("  {} - {}{}", agent.agent_type, agent.name, role);
        if !agent.description.is_empty() {
            println!("      {}", agent.description);
        }
    }

    Ok(true)
}

async fn show_status(orchestrator: &Orchestrator, json: bool) -> anyhow::Result<bool> {
    let status = orchestrator.executor_status().await;

    if json {
        print_json(&status)?;
        return Ok(true);
    }

    for (agent_type, s) in &status {
        let health = if s.healthy { "✓" } else { "✗" };
        let enabled = if s.enabled { "enabled" } else { "disabled" };
        println!("{} {} ({}, {})", health, agent_type, s.name, enabled);
    }

    Ok(true)
}

async fn run_single(
    orchestrator: &Orchestrator,
    request: TaskRequest,
    json: bool,
) -> anyhow::Result<bool> {
    let result = match orchestrator.run_task(request).await {
        Ok(result) => result,
        Err(TaskError::AgentNotFound(agent_type)) => {
            anyhow::bail!("Agent not found: {}", agent_type)
        }
        Err(err) => err.into_task_result(),
    };

    if json {
        print_json(&result)?;
    } else {
        print_task_result(&result);
    }

    Ok(result.success)
}

async fn run_batch(orchestrator: &Orchestrator, file: &Path, json: bool) -> anyhow::Result<bool> {
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }

    let requests = WorkflowLoader::load_batch(file)?;
    let report = orchestrator.run_many(requests).await;

    if json {
        print_json(&report)?;
    } else {
        print_batch_report(&report);
    }

    Ok(report.all_succeeded())
}

async fn run_workflows(orchestrator: &Orchestrator, path: &Path, json: bool) -> anyhow::Result<bool> {
    if !path.exists() {
        anyhow::bail!("Path not found: {}", path.display());
    }

    let workflows = if path.is_dir() {
        WorkflowLoader::load_directory(path)?
    } else {
        vec![WorkflowLoader::load_file(path)?]
    };

    let mut all_success = true;
    for workflow in workflows {
        let (run, error) = match orchestrator.run_workflow(workflow).await {
            Ok(run) => (run, None),
            Err(WorkflowError::Aborted { step, error, run }) => {
                (*run, Some(format!("aborted at step '{}': {}", step, error)))
            }
        };

        all_success &= error.is_none() && run.success();

        if json {
            print_json(&run)?;
        } else {
            print_workflow_run(&run, error.as_deref());
        }
    }

    Ok(all_success)
}

fn validate(path: &Path, config: Option<&Path>) -> anyhow::Result<bool> {
    if !path.exists() {
        anyhow::bail!("Path not found: {}", path.display());
    }

    let workflows = if path.is_dir() {
        WorkflowLoader::load_directory(path)?
    } else {
        vec![WorkflowLoader::load_file(path)?]
    };

    if workflows.is_empty() {
        println!("No workflows found in: {}", path.display());
        return Ok(true);
    }

    let known_agents = configured_agent_types(config)?;

    let mut clean = true;
    for workflow in &workflows {
        let mut problems: Vec<String> = workflow
            .unresolvable_dependencies()
            .into_iter()
            .map(|(step, dep)| {
                format!("step '{}' depends on '{}', which no earlier step produces", step, dep)
            })
            .collect();

        if let Some(known) = &known_agents {
            for step in &workflow.steps {
                if !known.contains(&step.agent_type) {
                    problems.push(format!(
                        "step '{}' uses agent type '{}', which is not registered",
                        step.task, step.agent_type
                    ));
                }
            }
        }

        if problems.is_empty() {
            println!("✓ {} ({} steps)", workflow.name, workflow.steps.len());
        } else {
            clean = false;
            println!("✗ {}", workflow.name);
            for problem in problems {
                println!("    {}", problem);
            }
        }
    }

    Ok(clean)
}

/// Enabled agent types from the config in use, if any config file is found
fn configured_agent_types(path: Option<&Path>) -> anyhow::Result<Option<HashSet<String>>> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG).exists() => Path::new(DEFAULT_CONFIG),
        None => return Ok(None),
    };

    let config = OrchestratorConfig::load(path)?;
    Ok(Some(
        config
            .agents
            .into_iter()
            .filter(|a| a.enabled)
            .map(|a| a.agent_type)
            .collect(),
    ))
}

fn print_task_result(result: &TaskResult) {
    let status = if result.success { "✓" } else { "✗" };
    println!("{} Task ({}ms)", status, result.duration_ms);
    if let Some(id) = &result.execution_record_id {
        println!("  Record: {}", id);
    }
    if let Some(value) = &result.result {
        println!("  Result: {}", value);
    }
    if let Some(err) = &result.error {
        println!("  Error: {}", err);
    }
}

fn print_batch_report(report: &BatchReport) {
    println!("\n=== Batch Result ===\n");
    println!(
        "Total: {}  Successful: {}  Failed: {}\n",
        report.total, report.successful, report.failed
    );

    for (i, entry) in report.results.iter().enumerate() {
        let status = if entry.success() { "✓" } else { "✗" };
        println!("{} Request {}", status, i + 1);
        if let Some(err) = entry.error() {
            println!("      Error: {}", err);
        }
    }
}

fn print_workflow_run(run: &WorkflowRun, abort: Option<&str>) {
    println!("\n=== Workflow: {} ===\n", run.name);
    println!(
        "Steps: {} total, {} completed, {} failed, {} skipped",
        run.total_steps, run.completed_steps, run.failed_steps, run.skipped_steps
    );
    if run.not_run_steps() > 0 {
        println!("Not run: {}", run.not_run_steps());
    }
    if let Some(reason) = abort {
        println!("Aborted: {}", reason);
    }
    println!();

    for entry in &run.steps {
        let status = match entry.status {
            StepStatus::Completed => "✓",
            StepStatus::Failed => "✗",
        };
        println!("{} {} ({})", status, entry.step.task, entry.step.agent_type);
        if let Some(err) = &entry.error {
            println!("      Error: {}", err);
        }
    }
}
