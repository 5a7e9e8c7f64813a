//! `flowrun` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    — start the API server.
//! - `run`      — execute a workflow JSON file once.
//! - `validate` — validate a workflow JSON file.
//! - `migrate`  — run pending database migrations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use engine::{
    ExecutorConfig, InMemoryRepository, NodeExecutors, PgWorkflowRepository, TraversalMode,
    Workflow, WorkflowExecutor, WorkflowRepository,
};

#[derive(Parser)]
#[command(name = "flowrun", about = "Workflow graph execution engine", version)]
struct Cli {
    /// TOML file with executor settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Upper bound on a single API node call, in seconds.
    #[arg(
        long,
        global = true,
        env = "FLOWRUN_API_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    api_timeout_secs: Option<u64>,

    /// Node visiting order: `declaration` or `graph`.
    #[arg(long, global = true, env = "FLOWRUN_TRAVERSAL")]
    traversal: Option<TraversalMode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        /// Postgres connection string; workflows are kept in memory without one.
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
    /// Execute a workflow definition JSON file and print the execution.
    Run {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
}

impl Cli {
    /// File settings first, then flags and environment on top.
    fn executor_config(&self) -> anyhow::Result<ExecutorConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read config {}", path.display()))?;
                ExecutorConfig::from_toml(&text)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => ExecutorConfig::default(),
        };
        if let Some(secs) = self.api_timeout_secs {
            config.api_timeout_secs = secs;
        }
        if let Some(mode) = self.traversal {
            config.traversal = mode;
        }
        Ok(config)
    }

    fn executor(&self) -> anyhow::Result<WorkflowExecutor> {
        let config = self.executor_config()?;
        let executors = NodeExecutors::standard(&config).context("cannot build HTTP client")?;
        Ok(WorkflowExecutor::new(executors, config))
    }
}

fn read_workflow(path: &Path) -> anyhow::Result<Workflow> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid workflow JSON in {}", path.display()))
}

/// Token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Interrupted, cancelling...");
        trigger.cancel();
    });
    cancel
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Serve { bind, database_url } => {
            let repo: Arc<dyn WorkflowRepository> = match database_url {
                Some(url) => {
                    let pool = db::pool::create_pool(url, 10)
                        .await
                        .context("failed to connect to database")?;
                    Arc::new(PgWorkflowRepository::new(pool))
                }
                None => {
                    warn!("DATABASE_URL not set, workflows are kept in memory only");
                    Arc::new(InMemoryRepository::new())
                }
            };

            info!("Starting API server on {bind}");
            let state = api::AppState::new(repo, cli.executor()?);
            api::serve(bind, state, cancel_on_ctrl_c()).await?;
        }
        Command::Run { path } => {
            let workflow = read_workflow(path)?;
            let executor = cli.executor()?;

            let result = executor.run(&workflow, cancel_on_ctrl_c()).await?;
            match result.into_result() {
                Ok(execution) => println!("{}", serde_json::to_string_pretty(&execution)?),
                Err((execution, err)) => {
                    println!("{}", serde_json::to_string_pretty(&execution)?);
                    eprintln!("Workflow execution failed: {err}");
                    std::process::exit(1);
                }
            }
        }
        Command::Validate { path } => {
            let workflow = read_workflow(path)?;

            match engine::validate_workflow(&workflow) {
                Ok(()) => println!(
                    "Workflow is valid: {} nodes, {} edges",
                    workflow.nodes.len(),
                    workflow.edges.len()
                ),
                Err(e) => {
                    eprintln!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Migrate { database_url } => {
            info!("Running migrations");
            let pool = db::pool::create_pool(database_url, 2)
                .await
                .context("failed to connect to database")?;
            db::pool::run_migrations(&pool).await.context("migration failed")?;
            info!("Migrations applied successfully");
        }
    }

    Ok(())
}
