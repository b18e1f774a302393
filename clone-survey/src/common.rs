//! Command-line plumbing shared by the survey binaries.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use clone_sim::{MdpKind, SimConfig};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Flags every survey accepts.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// JSON base configuration; sweep flags override its fields
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Experiment cache directory (omit to disable caching)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Output directory for the .npy results and manifest.json
    #[arg(long, short, default_value = "survey")]
    pub out: PathBuf,

    /// MDP variant: binary | self_nonself
    #[arg(long)]
    pub mdp: Option<String>,

    #[arg(long)]
    pub max_epoch: Option<u64>,

    #[arg(long)]
    pub record_per: Option<u64>,

    #[arg(long)]
    pub n_hidden: Option<usize>,

    /// Only log warnings; no progress bars
    #[arg(long)]
    pub quiet: bool,
}

impl CommonArgs {
    /// Base configuration: file (or defaults) with the flag overrides applied.
    pub fn base_config(&self) -> Result<SimConfig> {
        let mut cfg = match &self.config {
            Some(path) => SimConfig::from_json_file(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?,
            None => SimConfig::default(),
        };
        if let Some(mdp) = &self.mdp {
            cfg.mdp = mdp.parse::<MdpKind>()?;
        }
        if let Some(v) = self.max_epoch {
            cfg.max_epoch = v;
        }
        if let Some(v) = self.record_per {
            cfg.record_per = v;
        }
        if let Some(v) = self.n_hidden {
            cfg.n_hidden = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

pub fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// What a survey ran, written next to its arrays.
#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    pub survey: &'a str,
    pub base: &'a SimConfig,
    pub fingerprint: String,
    pub runs: u64,
    pub outputs: Vec<String>,
}

impl<'a> Manifest<'a> {
    pub fn new(survey: &'a str, base: &'a SimConfig, runs: u64) -> Self {
        Self {
            survey,
            base,
            fingerprint: base.fingerprint().to_string(),
            runs,
            outputs: Vec::new(),
        }
    }

    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(name.into());
        self
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let path = dir.join("manifest.json");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).with_context(|| format!("Failed to write: {}", path.display()))
    }
}

/// Run `$body` with `$sim` bound to a cached or uncached simulator.
#[macro_export]
macro_rules! with_simulator {
    ($common:expr, |$sim:ident| $body:expr) => {
        match &$common.cache_dir {
            Some(dir) => {
                let $sim = clone_sim::Simulator::new(dir).with_progress(!$common.quiet);
                $body
            }
            None => {
                let $sim = clone_sim::Simulator::uncached().with_progress(!$common.quiet);
                $body
            }
        }
    };
}
