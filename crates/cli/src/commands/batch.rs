// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rt batch <specs...>` - Run several tests concurrently

use super::load_spec;
use crate::adapters::{cancel_on_ctrl_c, make_runtime};
use crate::output::{batch_exit_code, print_results, write_report, OutputFormat};
use anyhow::Result;
use clap::Args;
use rt_core::{EngineConfig, ExitCode};
use rt_engine::RunRequest;
use std::path::PathBuf;

#[derive(Args)]
pub struct BatchArgs {
    /// Test spec files (TOML)
    #[arg(required = true)]
    pub specs: Vec<PathBuf>,

    /// Run the smoke-test variant of every spec
    #[arg(long)]
    pub smoke: bool,

    /// Write the JSON results to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn handle(
    args: BatchArgs,
    config: EngineConfig,
    format: OutputFormat,
) -> Result<ExitCode> {
    let requests = args
        .specs
        .iter()
        .map(|path| load_spec(path, args.smoke).map(RunRequest::new))
        .collect::<Result<Vec<_>>>()?;
    let runtime = make_runtime(config)?;
    let cancel = cancel_on_ctrl_c();

    tracing::info!(tests = requests.len(), "starting batch");
    let results = runtime.run_batch(requests, &cancel).await;

    print_results(&results, format)?;
    if let Some(path) = &args.output {
        write_report(path, &results)?;
    }
    Ok(batch_exit_code(&results))
}
