// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rt run <spec>` - Run one test

use super::load_spec;
use crate::adapters::{cancel_on_ctrl_c, make_runtime};
use crate::output::{print_result, write_report, OutputFormat};
use anyhow::Result;
use clap::Args;
use rt_core::{EngineConfig, ExitCode, Revision};
use rt_engine::{BisectPlan, RunRequest};
use std::path::PathBuf;

#[derive(Args)]
pub struct RunArgs {
    /// Test spec file (TOML)
    pub spec: PathBuf,

    /// Revision under test
    #[arg(long)]
    pub revision: Option<String>,

    /// Run the smoke-test variant of the spec
    #[arg(long)]
    pub smoke: bool,

    /// Last revision known to pass
    #[arg(long, requires = "bisect_revisions")]
    pub bisect_good: Option<String>,

    /// Revisions to bisect on failure, oldest first; the last is known bad
    #[arg(long, value_delimiter = ',')]
    pub bisect_revisions: Vec<String>,

    /// Write the JSON result report to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl RunArgs {
    fn request(&self) -> Result<RunRequest> {
        let spec = load_spec(&self.spec, self.smoke)?;
        let mut request = RunRequest::new(spec);

        // Without an explicit revision the run tests the known-bad end
        let revision = self
            .revision
            .clone()
            .or_else(|| self.bisect_revisions.last().cloned());
        if let Some(revision) = revision {
            request = request.with_revision(revision);
        }
        if !self.bisect_revisions.is_empty() {
            request = request.with_bisect(BisectPlan {
                known_good: self.bisect_good.clone().map(Revision::from),
                candidates: self
                    .bisect_revisions
                    .iter()
                    .map(|r| Revision::from(r.as_str()))
                    .collect(),
            });
        }
        Ok(request)
    }
}

pub async fn handle(args: RunArgs, config: EngineConfig, format: OutputFormat) -> Result<ExitCode> {
    let request = args.request()?;
    let runtime = make_runtime(config)?;
    let cancel = cancel_on_ctrl_c();

    let result = runtime.run(request, &cancel).await;

    print_result(&result, format)?;
    if let Some(path) = &args.output {
        write_report(path, &result)?;
    }
    Ok(result.process_exit_code())
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
