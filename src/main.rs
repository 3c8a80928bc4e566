mod catalog;
mod cli;
mod command;
mod engine;
mod model;
mod orchestrator;
mod output_log;
mod storage;
#[cfg(feature = "tui")]
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

fn default_log_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("robackup")
        .join("robackup.log")
}

/// The TUI owns the terminal, so its logs go to a file. Headless modes log
/// warnings to stderr and leave stdout to the copy tool.
fn init_tracing(args: &cli::Cli) -> Result<()> {
    let filter = |default: &str| {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into())
    };

    if !args.is_interactive() {
        tracing_subscriber::fmt()
            .with_env_filter(filter("warn"))
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    let log_path = args.log_file.clone().unwrap_or_else(default_log_path);
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create log directory '{}'", parent.display())
            })?;
        }
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file '{}'", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter("info"))
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_tracing(&args)?;
    let interactive = args.is_interactive();

    let status = cli::run(args).await?;
    // Headless modes exit with the copy tool's own code.
    if !interactive || status != 0 {
        std::process::exit(status);
    }
    Ok(())
}
