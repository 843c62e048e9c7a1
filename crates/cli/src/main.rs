// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rt - release test orchestrator CLI

mod adapters;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{batch, run, validate};
use output::OutputFormat;
use rt_core::{ConfigError, EngineConfig, ExitCode};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "rt",
    version,
    about = "Release test orchestrator - provision, run, classify and bisect release tests"
)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format for results on stdout
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one test, optionally bisecting a failure
    Run(run::RunArgs),
    /// Run several tests concurrently
    Batch(batch::BatchArgs),
    /// Check test specs and engine config without running anything
    Validate(validate::ValidateArgs),
}

fn main() -> std::process::ExitCode {
    setup_logging();
    let cli = Cli::parse();

    match execute(cli) {
        Ok(code) => std::process::ExitCode::from(code.code()),
        Err(e) => {
            eprintln!("error: {e:#}");
            error_exit_code(&e)
        }
    }
}

fn execute(cli: Cli) -> Result<ExitCode> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(dispatch(cli))
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    // Loaded for every command so `validate` also checks the config file
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Run(args) => run::handle(args, config, cli.format).await,
        Commands::Batch(args) => batch::handle(args, config, cli.format).await,
        Commands::Validate(args) => validate::handle(args, cli.format),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

/// Broken inputs share the config exit code; anything else is a plain failure
fn error_exit_code(error: &anyhow::Error) -> std::process::ExitCode {
    if error.chain().any(|cause| cause.is::<ConfigError>()) {
        std::process::ExitCode::from(ExitCode::ConfigError.code())
    } else {
        std::process::ExitCode::FAILURE
    }
}

/// Log to stderr, filtered by `RT_LOG` (default `info`)
fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env("RT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
