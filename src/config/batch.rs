// src/config/batch.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::loader::SourceFile;
use crate::ingest::locator::DEFAULT_STATE_INDEX;

pub const ENV_CONFIG_PATH: &str = "ECONCAL_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/calendar.toml";
pub const DEFAULT_OUTPUT: &str = "events.csv";

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}
fn default_strict() -> bool {
    true
}
fn default_state_index() -> usize {
    DEFAULT_STATE_INDEX
}

/// One page to read and the year its day labels belong to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceSpec {
    pub file: PathBuf,
    pub year: i32,
}

/// Batch description, usually from `config/calendar.toml`:
///
/// ```toml
/// base_dir = "data/forexfactory"
/// output = "June01_2025_December31_2025_events.csv"
///
/// [[sources]]
/// file = "June 2025.html"
/// year = 2025
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Relative `sources[].file` and `output` resolve against this.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Abort (and write nothing) when any record is rejected.
    #[serde(default = "default_strict")]
    pub strict: bool,
    #[serde(default = "default_state_index")]
    pub state_index: usize,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            output: default_output(),
            strict: default_strict(),
            state_index: default_state_index(),
            sources: Vec::new(),
        }
    }
}

impl BatchConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading batch config from {}", path.display()))?;
        let cfg: BatchConfig = toml::from_str(&content)
            .with_context(|| format!("parsing batch config {}", path.display()))?;
        Ok(cfg)
    }

    /// Load using env var + fallback:
    /// 1) $ECONCAL_CONFIG_PATH
    /// 2) config/calendar.toml
    ///
    /// `Ok(None)` when neither exists.
    pub fn load_default() -> Result<Option<Self>> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb).map(Some);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if p.exists() {
            return Self::load_from(&p).map(Some);
        }
        Ok(None)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            bail!("no input files: add [[sources]] to the config or pass files on the command line");
        }
        for s in &self.sources {
            if !(1970..=2100).contains(&s.year) {
                bail!("{}: year {} out of range", s.file.display(), s.year);
            }
        }
        Ok(())
    }

    pub fn resolved_sources(&self) -> Vec<SourceFile> {
        self.sources
            .iter()
            .map(|s| SourceFile::resolve(&self.base_dir, &s.file, s.year))
            .collect()
    }

    pub fn resolved_output(&self) -> PathBuf {
        if self.output.is_absolute() {
            self.output.clone()
        } else {
            self.base_dir.join(&self.output)
        }
    }
}
