//! `rt validate` specs

use crate::prelude::*;

#[test]
fn valid_specs_pass() {
    let temp = Project::empty();
    temp.file("a.toml", &spec_toml("alpha", "true", "1m"));
    temp.file("b.toml", &spec_toml("beta", "true", "10m"));

    temp.rt()
        .args(&["validate", "a.toml", "b.toml"])
        .passes()
        .stdout_has("ok       alpha")
        .stdout_has("ok       beta");
}

#[test]
fn one_bad_spec_fails_validation() {
    let temp = Project::empty();
    temp.file("a.toml", &spec_toml("alpha", "true", "1m"));
    temp.file("b.toml", &spec_toml("", "true", "1m"));

    temp.rt()
        .args(&["validate", "a.toml", "b.toml"])
        .exits_with(10)
        .stdout_has("ok       alpha")
        .stdout_has("invalid  b.toml: name must not be empty");
}

#[test]
fn validate_json_lists_errors() {
    let temp = Project::empty();
    temp.file("a.toml", &spec_toml("alpha", "true", "0s"));

    let out = temp
        .rt()
        .args(&["--format", "json", "validate", "a.toml"])
        .exits_with(10)
        .stdout();
    let checked: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(checked[0]["test"], serde_json::Value::Null);
    assert_eq!(checked[0]["error"], "timeout must be greater than zero");
}
