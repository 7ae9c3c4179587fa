use assert_cmd::Command;

fn normcheck() -> Command {
    let mut cmd = Command::cargo_bin("normcheck").unwrap();
    cmd.env_remove("NORMCHECK_SEED").env_remove("NORMCHECK_SYNC");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out).unwrap()
}

#[test]
fn help_lists_subcommands() {
    let s = stdout_of(normcheck().arg("--help"));
    for needle in ["suite", "case", "smoke"] {
        assert!(s.contains(needle), "help missing `{needle}`");
    }
}

#[test]
fn short_suite_prints_report_lines() {
    let s = stdout_of(normcheck().args(["suite", "--limit", "2", "--seed", "1"]));
    let lines: Vec<_> = s.lines().collect();
    assert_eq!(lines.len(), 2, "{s}");
    assert!(lines.iter().all(|l| l.starts_with("softmax test batch_size:")));
    assert!(lines[0].contains("data_type: half"));
}

#[test]
fn suite_json_is_the_only_stdout() {
    let s = stdout_of(normcheck().args(["suite", "--json", "--limit", "3", "--seed", "1"]));
    let report: serde_json::Value = serde_json::from_str(&s).unwrap();
    assert_eq!(report["backend"], "normcheck-cpu");
    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 3);
    for outcome in outcomes {
        assert!(outcome.get("error").is_none(), "{outcome}");
        assert!(outcome["report"]["max_abs_error"].as_f64().unwrap() < 1e-3);
    }
    assert_eq!(outcomes[0]["case"]["precision"], "half");
}

#[test]
fn single_case_passes() {
    let s = stdout_of(normcheck().args(["case", "1", "8", "4", "--iters", "2", "--sync"]));
    assert!(s.contains("data_type: single"), "{s}");
    assert!(s.contains("iter 2"), "{s}");
}

#[test]
fn unsupported_precision_fails() {
    let out = normcheck()
        .args(["case", "1", "8", "4", "--precision", "double"])
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(out.stdout.is_empty());
    let err = String::from_utf8(out.stderr).unwrap();
    assert!(err.contains("unsupported precision"), "{err}");
}

#[test]
fn empty_dimension_fails() {
    normcheck().args(["case", "1", "0", "4"]).assert().failure();
}

#[test]
fn smoke_runs() {
    let s = stdout_of(normcheck().arg("smoke"));
    assert!(s.contains("All smoke tests passed."));
}
