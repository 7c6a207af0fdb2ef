#![warn(clippy::all, clippy::pedantic)]

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use strata::cli::Cli;
use strata::{Config, StrataError};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(cli.verbose, &config.log.level))
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: could not install log subscriber: {err}");
    }

    match strata::app::dispatch(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            eprintln!("Error: {}", error_chain(&err));
            ExitCode::from(exit_code(&err))
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let working_path = match &cli.working_path {
        Some(path) => path.clone(),
        None => match std::env::var("STRATA_WORKING_PATH") {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path.trim()),
            _ => Config::default_working_path()?,
        },
    };
    Config::load_or_init(&working_path, cli.config.as_deref())
}

fn log_level(verbose: u8, configured: &str) -> Level {
    match verbose {
        0 => configured.parse().unwrap_or(Level::INFO),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// 2 for refusals raised before any file was touched, 1 otherwise.
fn exit_code(err: &StrataError) -> u8 {
    match err {
        StrataError::Migration(err) if err.is_preflight() => 2,
        _ => 1,
    }
}

fn error_chain(err: &StrataError) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}
