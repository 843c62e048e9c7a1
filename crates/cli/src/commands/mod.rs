// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod batch;
pub mod run;
pub mod validate;

use anyhow::Result;
use rt_core::TestSpec;
use std::path::Path;

/// Load a spec file, turning on its smoke overrides when asked
pub fn load_spec(path: &Path, smoke: bool) -> Result<TestSpec> {
    let spec = TestSpec::load(path)?;
    let smoke = smoke || spec.smoke_test;
    Ok(spec.with_smoke_test(smoke))
}
