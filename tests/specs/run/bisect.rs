//! Bisection specs
//!
//! The job reads `RT_REVISION`; revisions from r5 on are broken.

use crate::prelude::*;

const BROKEN_FROM_R5: &str =
    "case \"$RT_REVISION\" in r1|r2|r3|r4) exit 0;; *) echo \"FATAL regression\"; exit 1;; esac";

const REVISIONS: &str = "r1,r2,r3,r4,r5,r6,r7,r8";

#[test]
fn failing_run_bisects_to_first_bad_revision() {
    let temp = Project::empty();
    temp.file("spec.toml", &spec_toml("regress", BROKEN_FROM_R5, "1m"));

    temp.rt()
        .args(&[
            "run",
            "spec.toml",
            "--bisect-good",
            "r0",
            "--bisect-revisions",
            REVISIONS,
        ])
        .exits_with(40)
        .stdout_has("regress @ r8: failed")
        .stdout_has("first bad revision: r5")
        .stdout_has("probe r5 -> fail");
    assert_eq!(temp.live_clusters(), 0);
}

#[test]
fn passing_run_does_not_bisect() {
    let temp = Project::empty();
    temp.file("spec.toml", &spec_toml("regress", BROKEN_FROM_R5, "1m"));

    let out = temp
        .rt()
        .args(&[
            "run",
            "spec.toml",
            "--revision",
            "r2",
            "--bisect-revisions",
            REVISIONS,
        ])
        .passes()
        .stdout();
    assert!(!out.contains("probe"));
}

#[test]
fn probe_limit_makes_bisection_inconclusive() {
    let temp = Project::empty();
    temp.config("[bisect]\nmax_probes = 1\n");
    temp.file("spec.toml", &spec_toml("regress", BROKEN_FROM_R5, "1m"));

    temp.rt()
        .args(&[
            "run",
            "spec.toml",
            "--bisect-good",
            "r0",
            "--bisect-revisions",
            REVISIONS,
            "--output",
            "result.json",
        ])
        .exits_with(3);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(temp.path().join("result.json")).unwrap())
            .unwrap();
    assert_eq!(report["outcome"]["status"], "errored");
    assert_eq!(report["outcome"]["kind"], "bisect_inconclusive");
    assert_eq!(report["bisect"]["culprit"], serde_json::Value::Null);
    assert_eq!(
        report["bisect"]["inconclusive_reason"],
        "probe limit of 1 reached"
    );
}
