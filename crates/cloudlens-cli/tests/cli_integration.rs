#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;
use std::process::Command;

fn cloudlens() -> Command {
    Command::new(env!("CARGO_BIN_EXE_cloudlens"))
}

fn text_fixture(lines: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

#[test]
fn grep_keeps_only_matching_lines() {
    let file = text_fixture(&["all good", "ERROR: disk full", "ERROR: oom", "all good"]);
    let output = cloudlens()
        .args(["grep", file.path().to_str().unwrap(), "ERROR"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("disk full"));
    assert!(lines[1].contains("oom"));
}

#[test]
fn count_reports_match_total_after_exhaustion() {
    let file = text_fixture(&["warn", "ERROR one", "ERROR two", "warn"]);
    let output = cloudlens()
        .args(["count", file.path().to_str().unwrap(), "ERROR"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "2 matches"
    );
}

#[test]
fn count_singular_suffix_for_one_match() {
    let file = text_fixture(&["warn", "ERROR one"]);
    let output = cloudlens()
        .args(["count", file.path().to_str().unwrap(), "ERROR"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1 match");
}

#[test]
fn annotate_binds_named_captures_onto_matching_records() {
    let file = text_fixture(&["user=alice code=200", "no match here"]);
    let output = cloudlens()
        .args([
            "annotate",
            file.path().to_str().unwrap(),
            r"user=(?<user>\w+) code=(?<code:Number>\d+)",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first: serde_json::Value = serde_json::from_str(stdout.lines().next().unwrap()).unwrap();
    assert_eq!(first["user"], serde_json::json!("alice"));
    assert_eq!(first["code"], serde_json::json!(200));
}

#[test]
fn grep_reports_missing_file_and_exits_nonzero() {
    let output = cloudlens()
        .args(["grep", "/no/such/file/ever.log", "x"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("[cloudlens] error"));
}

#[test]
fn grep_on_json_file_routes_by_extension() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"[{{"message":"all good"}},{{"message":"ERROR: boom"}}]"#
    )
    .unwrap();

    let output = cloudlens()
        .args(["grep", file.path().to_str().unwrap(), "ERROR"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.contains("boom"));
}
