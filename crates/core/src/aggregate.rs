// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log aggregation
//!
//! [`LogAggregator`] is a pure fold over a job's [`LogRecord`]s. Fed the
//! same records in the same order it always produces the same
//! [`LogSummary`], which keeps results from different bisection probes
//! comparable.

use crate::config::LogConfig;
use crate::log::LogRecord;
use crate::spec::ConfigError;
use regex::Regex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Compiled aggregator patterns
#[derive(Debug, Clone)]
pub struct LogPatterns {
    metric: Regex,
    fatal: Vec<Regex>,
    tail_lines: usize,
}

impl LogPatterns {
    pub fn from_config(config: &LogConfig) -> Result<Self, ConfigError> {
        let metric = compile(&config.metric_pattern)?;
        let names: Vec<_> = metric.capture_names().flatten().collect();
        if !names.contains(&"name") || !names.contains(&"value") {
            return Err(ConfigError::InvalidPattern {
                pattern: config.metric_pattern.clone(),
                message: "metric pattern needs `name` and `value` groups".to_string(),
            });
        }
        let fatal = config
            .fatal_markers
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            metric,
            fatal,
            tail_lines: config.tail_lines,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// What the aggregator extracted from a job's output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogSummary {
    pub metrics: BTreeMap<String, f64>,
    /// First line that matched a fatal-error marker
    pub fatal_line: Option<String>,
    /// Most recent lines, oldest first
    pub tail: Vec<String>,
    pub lines_seen: usize,
}

/// Incremental extractor of metrics, fatal markers and a bounded tail
#[derive(Debug, Clone)]
pub struct LogAggregator {
    patterns: Arc<LogPatterns>,
    metrics: BTreeMap<String, f64>,
    fatal_line: Option<String>,
    tail: VecDeque<String>,
    lines_seen: usize,
}

impl LogAggregator {
    pub fn new(patterns: Arc<LogPatterns>) -> Self {
        Self {
            patterns,
            metrics: BTreeMap::new(),
            fatal_line: None,
            tail: VecDeque::new(),
            lines_seen: 0,
        }
    }

    /// Fold one record into the aggregate
    pub fn push(&mut self, record: &LogRecord) {
        self.lines_seen += 1;
        let line = record.line.as_str();

        if let Some(caps) = self.patterns.metric.captures(line) {
            let name = caps.name("name").map(|m| m.as_str());
            let value = caps
                .name("value")
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .filter(|v| v.is_finite());
            if let (Some(name), Some(value)) = (name, value) {
                self.metrics.insert(name.to_string(), value);
            }
        }

        if self.fatal_line.is_none() && self.patterns.fatal.iter().any(|re| re.is_match(line)) {
            self.fatal_line = Some(line.trim().to_string());
        }

        if self.patterns.tail_lines > 0 {
            if self.tail.len() == self.patterns.tail_lines {
                self.tail.pop_front();
            }
            self.tail.push_back(line.to_string());
        }
    }

    /// Summary of everything folded so far
    pub fn summary(&self) -> LogSummary {
        LogSummary {
            metrics: self.metrics.clone(),
            fatal_line: self.fatal_line.clone(),
            tail: self.tail.iter().cloned().collect(),
            lines_seen: self.lines_seen,
        }
    }

    pub fn finish(self) -> LogSummary {
        LogSummary {
            metrics: self.metrics,
            fatal_line: self.fatal_line,
            tail: self.tail.into_iter().collect(),
            lines_seen: self.lines_seen,
        }
    }

    /// Aggregate a complete record sequence
    pub fn fold<'a>(
        patterns: Arc<LogPatterns>,
        records: impl IntoIterator<Item = &'a LogRecord>,
    ) -> LogSummary {
        let mut agg = LogAggregator::new(patterns);
        for record in records {
            agg.push(record);
        }
        agg.finish()
    }
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;
