// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Span naming for effects

/// Something the engine executes inside its own tracing span
pub trait TracedEffect {
    /// Span name (e.g., "acquire_cluster", "submit_job")
    fn name(&self) -> &'static str;

    /// Key-value pairs recorded on the span
    fn fields(&self) -> Vec<(&'static str, String)>;
}
