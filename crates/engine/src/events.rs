// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run lifecycle event fan-out

use rt_core::Event;
use tokio::sync::mpsc;

/// Where `Emit` effects go.
///
/// Every event is logged; when a subscriber is attached it also receives a
/// copy. A dropped subscriber is not an error.
#[derive(Clone, Debug, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<Event>>,
}

impl EventSink {
    /// A sink that only logs
    pub fn none() -> Self {
        Self::default()
    }

    /// A sink paired with a receiver for the events
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, event: Event) {
        match &event {
            Event::RunFinished { run_id, outcome } => {
                tracing::info!(%run_id, %outcome, event = event.name(), "event")
            }
            Event::RunRetrying {
                run_id,
                retry,
                reason,
            } => tracing::warn!(%run_id, retry, reason = %reason, event = event.name(), "event"),
            _ => tracing::info!(run_id = %event.run_id(), event = event.name(), "event"),
        }
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
