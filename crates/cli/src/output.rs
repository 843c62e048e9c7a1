// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use anyhow::{Context, Result};
use clap::ValueEnum;
use rt_core::{ExitCode, RunResult};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Print one result in the specified format
pub fn print_result(result: &RunResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", render(result)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
    }
    Ok(())
}

/// Print a list of results
pub fn print_results(results: &[RunResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for result in results {
                println!("{}", render(result));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(results)?),
    }
    Ok(())
}

/// Write a JSON report file
pub fn write_report<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("writing report {}", path.display()))
}

/// Summary line plus the details a person needs to act on a failure
fn render(result: &RunResult) -> String {
    let mut text = result.summary_line();
    for (name, value) in &result.metrics {
        text.push_str(&format!("\n  metric {name} = {value}"));
    }
    if let Some(summary) = &result.error_summary {
        text.push_str(&format!("\n  error: {summary}"));
    }
    if let Some(report) = &result.bisect {
        for probe in &report.probes {
            text.push_str(&format!(
                "\n  probe {} -> {} ({} attempts)",
                probe.revision, probe.verdict, probe.attempts
            ));
        }
    }
    text
}

/// Exit code for a batch: the first unsuccessful result decides
pub fn batch_exit_code(results: &[RunResult]) -> ExitCode {
    results
        .iter()
        .map(RunResult::process_exit_code)
        .find(|code| *code != ExitCode::Success)
        .unwrap_or(ExitCode::Success)
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
