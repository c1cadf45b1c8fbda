//! Pantry runner
//!
//! Processes JSON-lines event files through the standard event tables.
//! Every file gets its own source and session; files are processed in
//! parallel and Ctrl-C cancels all of them.
//!
//! Usage: `pantry-run <file.jsonl>...`
//!
//! Environment:
//! - RUST_LOG: log filter (default `info`), logs go to stderr
//! - PANTRY_CANCEL_CHECK_INTERVAL, PANTRY_PROGRESS_STEP: processor tuning

mod report;
mod source;

use pantry::ProcessorConfig;
use pantry_core::PantryError;
use pantry_plugin::{CancellationToken, CookerRegistry};
use report::FileOutcome;
use source::EventRecord;
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let paths: Vec<PathBuf> = env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        eprintln!("usage: pantry-run <file.jsonl>...");
        return ExitCode::from(2);
    }

    match run(paths).await {
        Ok(outcomes) => {
            let failed = outcomes.iter().filter(|o| o.is_failure()).count();
            if let Err(e) = print_outcomes(&outcomes) {
                tracing::error!("cannot write report: {}", e);
                return ExitCode::FAILURE;
            }
            if failed > 0 {
                tracing::warn!(failed, "some files could not be processed");
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            tracing::error!(code = %err.code, "{}", err.message);
            ExitCode::FAILURE
        }
    }
}

async fn run(paths: Vec<PathBuf>) -> Result<Vec<FileOutcome>, PantryError> {
    let config = ProcessorConfig::from_env()?;
    let sources = source::source_ids(&paths)?;

    let mut registry = CookerRegistry::<EventRecord>::new();
    for source in &sources {
        registry = pantry_std::load_standard_cookers(registry, source)?;
    }
    let registry = Arc::new(registry);
    tracing::info!(files = paths.len(), cookers = registry.catalog().len(), "starting");

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling");
                cancel.cancel();
            }
        })
    };

    let mut tasks = JoinSet::new();
    for (index, (path, source)) in paths.into_iter().zip(sources).enumerate() {
        let registry = registry.clone();
        let config = config.clone();
        let cancel = cancel.clone();
        tasks.spawn_blocking(move || {
            let outcome = match report::process_file(&path, source, registry, config, &cancel) {
                Ok(report) => FileOutcome::Report(report),
                Err(error) => FileOutcome::Failed { file: path, error },
            };
            (index, outcome)
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(entry) => outcomes.push(entry),
            Err(e) => {
                watcher.abort();
                return Err(PantryError::internal(format!("worker task failed: {}", e)));
            }
        }
    }
    watcher.abort();

    outcomes.sort_by_key(|(index, _)| *index);
    Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
}

fn print_outcomes(outcomes: &[FileOutcome]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, outcomes)?;
    writeln!(out)?;
    out.flush()
}
