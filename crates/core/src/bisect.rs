// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bisection search state
//!
//! [`BisectRange`] holds the candidate revisions oldest first. The last
//! candidate is the known-bad revision and is never probed; the known-good
//! revision sits just before the first candidate. Each probe narrows the
//! window `[lo, hi]` where `hi` is always a revision known to be bad.
//!
//! [`ProbeTally`] turns the repeated attempts of one probe into a verdict
//! by strict majority, so a single flaky run cannot steer the search.

use crate::outcome::Outcome;
use crate::result::RunResult;
use crate::spec::{ConfigError, Revision};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Verdict for one revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    Inconclusive,
}

impl Verdict {
    /// Verdict of a single attempt
    pub fn of(outcome: Outcome) -> Verdict {
        match outcome {
            Outcome::Succeeded => Verdict::Pass,
            Outcome::Failed | Outcome::TimedOut => Verdict::Fail,
            Outcome::Errored(_) => Verdict::Inconclusive,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
            Verdict::Inconclusive => "inconclusive",
        };
        f.write_str(s)
    }
}

/// Majority vote over the attempts of one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTally {
    max_attempts: u32,
    passes: u32,
    fails: u32,
    errors: u32,
}

impl ProbeTally {
    /// `max_attempts` is the retry budget plus the first attempt
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            passes: 0,
            fails: 0,
            errors: 0,
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        match Verdict::of(outcome) {
            Verdict::Pass => self.passes += 1,
            Verdict::Fail => self.fails += 1,
            Verdict::Inconclusive => self.errors += 1,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.passes + self.fails + self.errors
    }

    fn majority(&self) -> u32 {
        self.max_attempts / 2 + 1
    }

    /// The verdict once it can no longer change, `None` while undecided
    pub fn verdict(&self) -> Option<Verdict> {
        let needed = self.majority();
        if self.passes >= needed {
            return Some(Verdict::Pass);
        }
        if self.fails >= needed {
            return Some(Verdict::Fail);
        }
        let remaining = self.max_attempts.saturating_sub(self.attempts());
        if self.passes + remaining < needed && self.fails + remaining < needed {
            return Some(Verdict::Inconclusive);
        }
        None
    }
}

/// Everything known about one tested revision
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRecord {
    pub revision: Revision,
    pub verdict: Verdict,
    pub attempts: u32,
    /// Result of the last attempt
    pub result: Option<RunResult>,
}

/// What the search wants next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BisectStep {
    Probe { index: usize, revision: Revision },
    Found { index: usize, revision: Revision },
    Inconclusive { reason: String },
}

/// Serializable account of a finished bisection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BisectReport {
    pub known_good: Option<Revision>,
    pub known_bad: Revision,
    pub culprit: Option<Revision>,
    pub probes: Vec<ProbeSummary>,
    pub inconclusive_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSummary {
    pub revision: Revision,
    pub verdict: Verdict,
    pub attempts: u32,
}

/// Window of candidate revisions still under suspicion
#[derive(Debug, Clone)]
pub struct BisectRange {
    known_good: Option<Revision>,
    candidates: Vec<Revision>,
    lo: usize,
    hi: usize,
    probe_index: Option<usize>,
    tested: BTreeMap<Revision, ProbeRecord>,
    /// Fresh probes in the order they ran; seeded verdicts are not probes
    probe_order: Vec<Revision>,
    conflict: Option<String>,
    terminal: Option<Revision>,
}

impl BisectRange {
    /// Candidates ordered oldest first; the last one is the known-bad revision
    pub fn new(
        known_good: Option<Revision>,
        candidates: Vec<Revision>,
    ) -> Result<Self, ConfigError> {
        if candidates.is_empty() {
            return Err(ConfigError::InvalidBisectRange(
                "no candidate revisions".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for rev in candidates.iter().chain(known_good.iter()) {
            if !seen.insert(rev) {
                return Err(ConfigError::InvalidBisectRange(format!(
                    "revision {rev} listed twice"
                )));
            }
        }
        let hi = candidates.len() - 1;
        Ok(Self {
            known_good,
            candidates,
            lo: 0,
            hi,
            probe_index: None,
            tested: BTreeMap::new(),
            probe_order: Vec::new(),
            conflict: None,
            terminal: None,
        })
    }

    pub fn candidates(&self) -> &[Revision] {
        &self.candidates
    }

    pub fn known_bad(&self) -> &Revision {
        &self.candidates[self.candidates.len() - 1]
    }

    /// Index of the revision currently being probed
    pub fn probe_index(&self) -> Option<usize> {
        self.probe_index
    }

    pub fn is_tested(&self, revision: &Revision) -> bool {
        self.tested.contains_key(revision)
    }

    pub fn tested(&self, revision: &Revision) -> Option<&ProbeRecord> {
        self.tested.get(revision)
    }

    /// Number of fresh probes recorded so far
    pub fn probe_count(&self) -> usize {
        self.probe_order.len()
    }

    pub fn terminal(&self) -> Option<&Revision> {
        self.terminal.as_ref()
    }

    /// Decide the next step of the search
    pub fn next_step(&mut self) -> BisectStep {
        if let Some(reason) = &self.conflict {
            return BisectStep::Inconclusive {
                reason: reason.clone(),
            };
        }
        if self.lo >= self.hi {
            let revision = self.candidates[self.hi].clone();
            self.terminal = Some(revision.clone());
            self.probe_index = None;
            return BisectStep::Found {
                index: self.hi,
                revision,
            };
        }

        let index = self.lo + (self.hi - self.lo) / 2;
        let revision = self.candidates[index].clone();
        if let Some(record) = self.tested.get(&revision) {
            // Only an inconclusive verdict can leave a tested revision inside the window
            return BisectStep::Inconclusive {
                reason: format!("revision {revision} was {}", record.verdict),
            };
        }
        self.probe_index = Some(index);
        BisectStep::Probe { index, revision }
    }

    /// Record a fresh probe and narrow the window
    pub fn record(&mut self, record: ProbeRecord) {
        self.probe_order.push(record.revision.clone());
        self.apply(record);
    }

    /// Record a verdict obtained outside the search (the run that triggered it)
    pub fn seed(&mut self, record: ProbeRecord) {
        self.apply(record);
    }

    fn apply(&mut self, record: ProbeRecord) {
        let Some(index) = self.candidates.iter().position(|r| *r == record.revision) else {
            tracing::debug!(revision = %record.revision, "ignoring verdict for non-candidate");
            return;
        };
        self.probe_index = None;

        match record.verdict {
            Verdict::Pass if index >= self.hi => {
                self.conflict = Some(format!(
                    "revision {} passed but a revision at or before it failed",
                    record.revision
                ));
            }
            Verdict::Pass => self.lo = self.lo.max(index + 1),
            Verdict::Fail if index < self.lo => {
                self.conflict = Some(format!(
                    "revision {} failed but a later revision passed",
                    record.revision
                ));
            }
            Verdict::Fail => self.hi = self.hi.min(index),
            Verdict::Inconclusive => {
                self.conflict = Some(format!(
                    "revision {} gave no majority verdict",
                    record.revision
                ));
            }
        }
        self.tested.insert(record.revision.clone(), record);
    }

    /// Mark the search as abandoned
    pub fn abandon(&mut self, reason: impl Into<String>) {
        self.conflict = Some(reason.into());
    }

    pub fn report(&self) -> BisectReport {
        let probes = self
            .probe_order
            .iter()
            .filter_map(|rev| self.tested.get(rev))
            .map(|r| ProbeSummary {
                revision: r.revision.clone(),
                verdict: r.verdict,
                attempts: r.attempts,
            })
            .collect();
        BisectReport {
            known_good: self.known_good.clone(),
            known_bad: self.known_bad().clone(),
            culprit: self.terminal.clone(),
            probes,
            inconclusive_reason: self.conflict.clone(),
        }
    }
}

#[cfg(test)]
#[path = "bisect_tests.rs"]
mod tests;
