mod config;
mod error;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use approver::{Cancellation, ReviewEngine, ReviewResult, ReviewStatus};
use chrono::Local;
use clap::{Parser, Subcommand};
use plugin::EvaluatorProcess;
use policy::{CertificateRequest, Evaluator, PolicyList};
use rbac::RbacOracle;
use storage::{ReviewRecord, SqliteStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "approver.toml";
const SPEC_PREVIEW_LEN: usize = 60;

#[derive(Parser)]
#[command(name = "approver")]
#[command(about = "Approve or deny certificate requests against bound policies", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage certificate request policies
    Policy {
        #[command(subcommand)]
        action: PolicyCommand,
    },
    /// Review a certificate request document
    Review {
        /// TOML request document
        file: PathBuf,
    },
    /// Show recent reviews
    History {
        /// Show only the last N reviews
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum PolicyCommand {
    /// Create or replace the policies in a TOML document
    Apply { file: PathBuf },
    /// List all policies
    List,
    /// Delete a policy by name
    Delete { name: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;
    init_logging(&config.log_level);

    match cli.command {
        Commands::Policy { action } => {
            match action {
                PolicyCommand::Apply { file } => cmd_policy_apply(&config, &file)?,
                PolicyCommand::List => cmd_policy_list(&config)?,
                PolicyCommand::Delete { name } => cmd_policy_delete(&config, &name)?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Review { file } => cmd_review(&config, &file).await,
        Commands::History { limit } => {
            cmd_history(&config, limit)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_policy_apply(config: &Config, file: &Path) -> Result<()> {
    let policies = PolicyList::load(file)?;
    if policies.is_empty() {
        println!("No policies in {}.", file.display());
        return Ok(());
    }

    let store = create_store(config)?;
    info!(count = policies.len(), file = %file.display(), "applying policies");

    for policy in policies {
        let action = if store.get(&policy.name)?.is_some() {
            "configured"
        } else {
            "created"
        };
        store.apply(&policy)?;
        println!("policy '{}' {action}", policy.name);
    }

    Ok(())
}

fn cmd_policy_list(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let policies = store.policies()?;

    if policies.is_empty() {
        println!("No policies found.");
        return Ok(());
    }

    println!("{:<32}  SPEC", "NAME");
    println!("{}", "-".repeat(80));

    for policy in policies {
        let spec = serde_json::to_string(&policy.spec).unwrap_or_default();
        // Truncate long specs for display
        let spec = if spec.chars().count() > SPEC_PREVIEW_LEN {
            let preview: String = spec.chars().take(SPEC_PREVIEW_LEN).collect();
            format!("{preview}...")
        } else {
            spec
        };
        println!("{:<32}  {spec}", policy.name);
    }

    Ok(())
}

fn cmd_policy_delete(config: &Config, name: &str) -> Result<()> {
    let store = open_store(config)?;
    if !store.delete(name)? {
        return Err(Error::PolicyNotFound {
            name: name.to_string(),
        });
    }
    println!("policy '{name}' deleted");
    Ok(())
}

async fn cmd_review(config: &Config, file: &Path) -> Result<ExitCode> {
    let request = CertificateRequest::load(file)?;
    let store = Arc::new(create_store(config)?);
    let oracle = Arc::new(load_oracle(config)?);
    let evaluators = start_evaluators(config).await?;

    let engine = ReviewEngine::builder(store.clone(), oracle)
        .evaluators(
            evaluators
                .iter()
                .map(|e| Arc::clone(e) as Arc<dyn Evaluator>),
        )
        .build();

    let (handle, cancel) = Cancellation::new();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling review");
            handle.cancel();
        }
    });

    let result = engine.review(&request, &cancel).await;
    interrupt.abort();

    stop_evaluators(&evaluators).await;

    let result = result?;
    store.append_review(&ReviewRecord::new(
        request.key(),
        request.user.username.as_str(),
        result.status.as_str(),
        result.message.as_str(),
    ))?;

    println!("{result}");
    Ok(exit_code(&result))
}

fn cmd_history(config: &Config, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let records = store.reviews(limit)?;

    if records.is_empty() {
        println!("No reviews found.");
        return Ok(());
    }

    println!(
        "{:<20}  {:<32}  {:<16}  {:<12}  MESSAGE",
        "TIME", "REQUEST", "USER", "RESULT"
    );
    println!("{}", "-".repeat(100));

    for record in records {
        let time = record
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S");
        println!(
            "{:<20}  {:<32}  {:<16}  {:<12}  {}",
            time, record.request, record.username, record.status, record.message
        );
    }

    Ok(())
}

fn exit_code(result: &ReviewResult) -> ExitCode {
    match result.status {
        ReviewStatus::Approved => ExitCode::SUCCESS,
        ReviewStatus::Denied => ExitCode::from(2),
        ReviewStatus::Unprocessed => ExitCode::from(3),
    }
}

async fn start_evaluators(config: &Config) -> Result<Vec<Arc<EvaluatorProcess>>> {
    let mut evaluators = Vec::with_capacity(config.evaluators.len());

    for evaluator_config in &config.evaluators {
        let name = evaluator_config.name.clone();
        match EvaluatorProcess::start(evaluator_config.clone()).await {
            Ok(process) => evaluators.push(Arc::new(process)),
            Err(source) => {
                // Don't leave already started evaluators running
                stop_evaluators(&evaluators).await;
                return Err(Error::EvaluatorStart { name, source });
            }
        }
    }

    info!(count = evaluators.len(), "evaluators started");
    Ok(evaluators)
}

async fn stop_evaluators(evaluators: &[Arc<EvaluatorProcess>]) {
    for evaluator in evaluators {
        if let Err(e) = evaluator.shutdown().await {
            warn!(evaluator = evaluator.name(), error = %e, "failed to stop evaluator");
        }
    }
}

fn load_oracle(config: &Config) -> Result<RbacOracle> {
    if config.rbac.exists() {
        let oracle = RbacOracle::load(&config.rbac)?;
        info!(
            path = %config.rbac.display(),
            roles = oracle.rules().roles.len(),
            bindings = oracle.rules().bindings.len(),
            "rbac rules loaded"
        );
        Ok(oracle)
    } else {
        warn!(path = %config.rbac.display(), "rbac rules not found, no policies will be bound");
        Ok(RbacOracle::empty())
    }
}

/// Open the store, creating the database if needed.
fn create_store(config: &Config) -> Result<SqliteStore> {
    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(SqliteStore::open(&db_path)?)
}

/// Open an existing store.
fn open_store(config: &Config) -> Result<SqliteStore> {
    let db_path = config.database_path();

    if !db_path.exists() {
        return Err(Error::DatabaseNotFound { path: db_path });
    }

    Ok(SqliteStore::open(&db_path)?)
}
