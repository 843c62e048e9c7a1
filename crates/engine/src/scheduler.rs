// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource-class leases for concurrent runs

use crate::RuntimeError;
use rt_core::EngineConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Lease table keyed by resource class.
///
/// Each class is a semaphore sized from the engine config, one slot when
/// the class is not configured. Runs without a class are unrestricted.
#[derive(Debug, Default)]
pub struct Scheduler {
    config: EngineConfig,
    classes: Mutex<HashMap<String, Arc<Semaphore>>>,
}

/// A held slot in a resource class, returned on drop
#[derive(Debug)]
pub struct Lease {
    class: String,
    _permit: OwnedSemaphorePermit,
}

impl Lease {
    pub fn class(&self) -> &str {
        &self.class
    }
}

impl Scheduler {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.clone(),
            classes: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self, class: &str) -> u32 {
        self.config.class_capacity(class)
    }

    fn semaphore(&self, class: &str) -> Arc<Semaphore> {
        let mut classes = self.classes.lock().unwrap_or_else(|e| e.into_inner());
        let semaphore = classes
            .entry(class.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.capacity(class) as usize)));
        Arc::clone(semaphore)
    }

    /// Wait for a slot in `class`; `None` needs no lease
    pub async fn lease(&self, class: Option<&str>) -> Result<Option<Lease>, RuntimeError> {
        let Some(class) = class else {
            return Ok(None);
        };
        let semaphore = self.semaphore(class);
        if semaphore.available_permits() == 0 {
            tracing::info!(class, "waiting for resource class");
        }
        let permit = semaphore
            .acquire_owned()
            .await
            .map_err(|_| RuntimeError::SchedulerClosed(class.to_string()))?;
        tracing::debug!(class, "lease acquired");
        Ok(Some(Lease {
            class: class.to_string(),
            _permit: permit,
        }))
    }

    /// Slots currently free in `class`
    pub fn available(&self, class: &str) -> usize {
        self.semaphore(class).available_permits()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
