// src/cli.rs
use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{BatchConfig, SourceSpec};
use crate::emit::write_events_to_path;
use crate::ingest::run_batch;
use crate::merge::merge_files;
use crate::observability::LogFormat;

#[derive(Debug, Parser)]
#[command(
    name = "econ-calendar-csv",
    version,
    about = "Extract economic-calendar events embedded in saved calendar pages into CSV"
)]
pub struct Cli {
    /// Log encoding on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Convert saved calendar pages into one ordered CSV.
    Extract(ExtractArgs),
    /// Combine two emitted CSV files around a cutoff instant.
    Merge(MergeArgs),
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Batch config (TOML). Defaults to $ECONCAL_CONFIG_PATH or config/calendar.toml.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Directory that relative input/output paths resolve against.
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Year of the day labels in the files given on the command line.
    #[arg(long)]
    pub year: Option<i32>,

    #[arg(long, short)]
    pub out: Option<PathBuf>,

    /// Drop rejected records instead of aborting the run.
    #[arg(long)]
    pub lenient: bool,

    /// Index into `window.calendarComponentStates`.
    #[arg(long)]
    pub state_index: Option<usize>,

    /// Pages to convert; replaces the config's sources.
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Rows from here are kept only before the cutoff.
    #[arg(long)]
    pub base: PathBuf,

    /// All rows from here are kept.
    #[arg(long)]
    pub overlay: PathBuf,

    /// RFC 3339 instant, e.g. 2025-06-01T00:00:00-08:00
    #[arg(long, value_parser = parse_cutoff)]
    pub cutoff: DateTime<FixedOffset>,

    #[arg(long, short)]
    pub out: PathBuf,
}

fn parse_cutoff(s: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(s).map_err(|e| format!("{s:?}: {e}"))
}

/// Combine config file, defaults and flags into the batch to run.
pub fn build_config(args: &ExtractArgs) -> Result<BatchConfig> {
    let mut cfg = match &args.config {
        Some(p) => BatchConfig::load_from(p)?,
        None if args.files.is_empty() => BatchConfig::load_default()?.unwrap_or_default(),
        None => BatchConfig::default(),
    };

    if let Some(d) = &args.base_dir {
        cfg.base_dir = d.clone();
    }
    if let Some(o) = &args.out {
        cfg.output = o.clone();
    }
    if let Some(i) = args.state_index {
        cfg.state_index = i;
    }
    if args.lenient {
        cfg.strict = false;
    }
    if !args.files.is_empty() {
        let Some(year) = args.year else {
            bail!("--year is required when files are given on the command line");
        };
        cfg.sources = args
            .files
            .iter()
            .map(|f| SourceSpec {
                file: f.clone(),
                year,
            })
            .collect();
    }

    cfg.validate()?;
    Ok(cfg)
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Extract(args) => run_extract(&args),
        Command::Merge(args) => run_merge(&args),
    }
}

fn run_extract(args: &ExtractArgs) -> Result<()> {
    let cfg = build_config(args)?;
    let sources = cfg.resolved_sources();
    let (events, report) = run_batch(&sources, cfg.state_index);

    // each rejected record was already logged by run_batch
    if report.has_record_errors() && cfg.strict {
        bail!(
            "{} record(s) rejected; nothing written (use --lenient to drop them)",
            report.record_errors.len()
        );
    }
    if events.is_empty() && report.skipped_files.len() == report.files_total {
        bail!("no data was extracted from any file");
    }

    let out = cfg.resolved_output();
    write_events_to_path(&out, &events).with_context(|| format!("writing {}", out.display()))?;

    let range = match (events.first(), events.last()) {
        (Some(a), Some(b)) => format!(", {} .. {}", a.datetime, b.datetime),
        _ => String::new(),
    };
    println!(
        "Wrote {} events to {} ({} of {} pages skipped, {} duplicates removed, {} rejected{range})",
        events.len(),
        out.display(),
        report.skipped_files.len(),
        report.files_total,
        report.dedup_removed,
        report.record_errors.len(),
    );
    Ok(())
}

fn run_merge(args: &MergeArgs) -> Result<()> {
    let merged = merge_files(&args.base, &args.overlay, args.cutoff, &args.out)?;
    println!(
        "Wrote {} events to {} ({} duplicates removed)",
        merged.events.len(),
        args.out.display(),
        merged.removed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn files_on_command_line_need_year() {
        let cli = Cli::try_parse_from(["econ-calendar-csv", "extract", "a.html"]).unwrap();
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "econ-calendar-csv",
            "extract",
            "--base-dir",
            "/data",
            "--year",
            "2025",
            "--out",
            "x.csv",
            "--lenient",
            "June 2025.html",
            "July 2025.html",
        ])
        .unwrap();
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        let cfg = build_config(&args).unwrap();
        assert!(!cfg.strict);
        assert_eq!(cfg.sources.len(), 2);
        assert_eq!(cfg.resolved_output(), PathBuf::from("/data/x.csv"));
    }

    #[test]
    fn strict_rejection_logs_each_record_once() {
        let dir = tempfile::tempdir().unwrap();
        let page = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/bad_impact.html");
        let out = dir.path().join("out.csv");
        let cli = Cli::try_parse_from([
            "econ-calendar-csv",
            "extract",
            "--year",
            "2025",
            "--out",
            out.to_str().unwrap(),
            page,
        ])
        .unwrap();
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };

        let (res, logs) = crate::test_log::capture(|| run_extract(&args));

        assert!(res.is_err());
        assert!(!out.exists());
        assert_eq!(logs.matches("Mystery Index").count(), 1, "{logs}");
    }

    #[test]
    fn merge_cutoff_must_be_rfc3339() {
        assert!(Cli::try_parse_from([
            "econ-calendar-csv", "merge", "--base", "a.csv", "--overlay", "b.csv",
            "--cutoff", "2025-06-01", "--out", "c.csv",
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "econ-calendar-csv", "merge", "--base", "a.csv", "--overlay", "b.csv",
            "--cutoff", "2025-06-01T00:00:00-08:00", "--out", "c.csv",
        ])
        .is_ok());
    }
}
