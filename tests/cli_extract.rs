// tests/cli_extract.rs
use clap::Parser;
use econ_calendar_csv::cli::{run, Cli};
use std::path::Path;

fn fixtures() -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .display()
        .to_string()
}

#[test]
fn strict_run_writes_nothing_when_records_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("events.csv");
    let cli = Cli::try_parse_from([
        "econ-calendar-csv",
        "extract",
        "--base-dir",
        &fixtures(),
        "--year",
        "2025",
        "--out",
        out.to_str().unwrap(),
        "jan_2025_week1.html",
        "bad_impact.html",
    ])
    .unwrap();

    let err = run(cli).unwrap_err();
    assert!(err.to_string().contains("2 record(s) rejected"));
    assert!(!out.exists());
}

#[test]
fn lenient_run_drops_rejected_records() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("events.csv");
    let cli = Cli::try_parse_from([
        "econ-calendar-csv",
        "extract",
        "--base-dir",
        &fixtures(),
        "--year",
        "2025",
        "--out",
        out.to_str().unwrap(),
        "--lenient",
        "jan_2025_week1.html",
        "bad_impact.html",
    ])
    .unwrap();

    run(cli).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    // header + 6 from week 1 + "Fine Event"
    assert_eq!(text.lines().count(), 8);
    assert!(text.contains("Fine Event"));
    assert!(!text.contains("Mystery Index"));
}

#[test]
fn all_pages_failing_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("events.csv");
    let cli = Cli::try_parse_from([
        "econ-calendar-csv",
        "extract",
        "--base-dir",
        &fixtures(),
        "--year",
        "2025",
        "--out",
        out.to_str().unwrap(),
        "no_payload.html",
    ])
    .unwrap();
    assert!(run(cli).is_err());
    assert!(!out.exists());
}
