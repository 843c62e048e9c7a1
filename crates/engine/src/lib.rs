// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Release test execution engine

mod bisect;
mod cancel;
mod error;
mod events;
mod executor;
mod monitor;
mod runtime;
mod scheduler;

pub use bisect::{seed_record, Bisector, ProbeRunner};
pub use cancel::CancelToken;
pub use error::RuntimeError;
pub use events::EventSink;
pub use executor::{Executed, Executor};
pub use monitor::{JobWatch, WatchSettings, Watched};
pub use runtime::{BisectPlan, RunRequest, Runtime, RuntimeDeps};
pub use scheduler::{Lease, Scheduler};
