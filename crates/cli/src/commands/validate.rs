// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rt validate <specs...>` - Check specs without running them

use crate::output::OutputFormat;
use anyhow::Result;
use clap::Args;
use rt_core::{ExitCode, TestSpec};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args)]
pub struct ValidateArgs {
    /// Test spec files (TOML)
    #[arg(required = true)]
    pub specs: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Checked {
    path: PathBuf,
    test: Option<String>,
    error: Option<String>,
}

impl std::fmt::Display for Checked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.test, &self.error) {
            (_, Some(error)) => write!(f, "invalid  {}: {}", self.path.display(), error),
            (Some(test), None) => write!(f, "ok       {} ({})", test, self.path.display()),
            (None, None) => write!(f, "ok       {}", self.path.display()),
        }
    }
}

pub fn handle(args: ValidateArgs, format: OutputFormat) -> Result<ExitCode> {
    let checked: Vec<Checked> = args
        .specs
        .into_iter()
        .map(|path| match TestSpec::load(&path) {
            Ok(spec) => Checked {
                path,
                test: Some(spec.name),
                error: None,
            },
            Err(e) => Checked {
                path,
                test: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    match format {
        OutputFormat::Text => {
            for entry in &checked {
                println!("{entry}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&checked)?),
    }

    if checked.iter().any(|c| c.error.is_some()) {
        Ok(ExitCode::ConfigError)
    } else {
        Ok(ExitCode::Success)
    }
}
