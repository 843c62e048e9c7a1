//! Help output specs

use crate::prelude::*;

#[test]
fn help_lists_commands() {
    let temp = Project::empty();
    temp.rt_bare()
        .args(&["--help"])
        .passes()
        .stdout_has("run")
        .stdout_has("batch")
        .stdout_has("validate");
}

#[test]
fn run_help_describes_bisect_flags() {
    let temp = Project::empty();
    temp.rt_bare()
        .args(&["run", "--help"])
        .passes()
        .stdout_has("--bisect-good")
        .stdout_has("--bisect-revisions")
        .stdout_has("--smoke");
}
