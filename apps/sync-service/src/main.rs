//! # Retail Sync Service
//!
//! Keeps the Fishbowl retail location in line with the storefront.
//!
//! ## Usage
//! ```text
//! retail-sync-service [--config PATH] [COMMAND]
//!
//!   run            start the scheduler and wait for Ctrl+C / SIGTERM (default)
//!   sync           run one sync pass for the configured method
//!   check          run one sales check
//!   lookup <SKU>   validate a SKU against Fishbowl
//!   status         runtime config, error and audit counters
//! ```
//!
//! One-shot commands print their result as JSON and exit non-zero on failure.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use retail_core::{AuditLogStats, CommandResponse, ErrorStats, SyncConfig};
use retail_store::Store;
use retail_sync::{Scheduler, ServiceConfig, SyncEngine};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Run,
    Sync,
    Check,
    Lookup(String),
    Status,
}

#[derive(Debug, Serialize)]
struct Status {
    config: SyncConfig,
    tracked_skus: usize,
    errors: ErrorStats,
    audit: AuditLogStats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let (config_path, command) = parse_args(std::env::args().skip(1))?;

    let config = ServiceConfig::load(config_path).context("Failed to load service configuration")?;
    let store = Store::open(config.store_config())
        .await
        .context("Failed to open inventory store")?;
    let engine = Arc::new(SyncEngine::from_config(&config, store)?);

    let success = match command {
        Command::Run => {
            run(engine).await?;
            true
        }
        Command::Sync => print_response(engine.determine_sync().await)?,
        Command::Check => print_response(engine.run_sales_check().await)?,
        Command::Lookup(sku) => {
            let lookup = engine.get_sku_info(&sku).await;
            println!("{}", serde_json::to_string_pretty(&lookup)?);
            lookup.success
        }
        Command::Status => {
            let status = status(engine.store()).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            true
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

/// Runs the scheduler until a shutdown signal arrives.
async fn run(engine: Arc<SyncEngine>) -> anyhow::Result<()> {
    info!("Starting retail sync service");
    let scheduler = Scheduler::start(engine)
        .await
        .context("Failed to start scheduler")?;

    for job in scheduler.jobs().await {
        info!(job = %job.kind, interval_minutes = job.interval_minutes, first_run = %job.first_run, "Job ready");
    }

    shutdown_signal().await;
    scheduler.shutdown().await;

    info!("Service shutdown complete");
    Ok(())
}

fn print_response<T: Serialize>(result: Result<T, retail_core::Failure>) -> anyhow::Result<bool> {
    let response = CommandResponse::from(result);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(response.success)
}

async fn status(store: &Store) -> anyhow::Result<Status> {
    let inventory = store.inventory();
    Ok(Status {
        config: inventory.get_config().await?,
        tracked_skus: inventory.get_all_skus().await?.len(),
        errors: store.errors().get_stats().await?,
        audit: inventory.get_log_stats().await?,
    })
}

/// Parses `[--config PATH] [COMMAND [ARG]]`.
fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<(Option<PathBuf>, Command)> {
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => match args.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => bail!("--config requires a path"),
            },
            flag if flag.starts_with('-') => bail!("Unknown option: {}", flag),
            _ => positional.push(arg),
        }
    }

    let command = match positional.as_slice() {
        [] => Command::Run,
        [cmd] if cmd == "run" => Command::Run,
        [cmd] if cmd == "sync" => Command::Sync,
        [cmd] if cmd == "check" => Command::Check,
        [cmd] if cmd == "status" => Command::Status,
        [cmd, sku] if cmd == "lookup" => Command::Lookup(sku.clone()),
        [cmd] if cmd == "lookup" => bail!("lookup requires a SKU"),
        other => bail!("Unknown command: {}", other.join(" ")),
    };

    Ok((config_path, command))
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,retail_sync=debug,reqwest=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping jobs...");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_command_is_run() {
        let (path, command) = parse_args(args(&[])).unwrap();
        assert!(path.is_none());
        assert_eq!(command, Command::Run);
    }

    #[test]
    fn test_config_flag_and_lookup() {
        let (path, command) = parse_args(args(&["--config", "/etc/sync.toml", "lookup", "TENT-2P"])).unwrap();
        assert_eq!(path, Some(PathBuf::from("/etc/sync.toml")));
        assert_eq!(command, Command::Lookup("TENT-2P".into()));
    }

    #[test]
    fn test_bad_arguments() {
        assert!(parse_args(args(&["lookup"])).is_err());
        assert!(parse_args(args(&["--config"])).is_err());
        assert!(parse_args(args(&["--verbose"])).is_err());
        assert!(parse_args(args(&["deploy"])).is_err());
    }
}
