//! Clone Sim: run one configured simulation through the experiment cache.
//!
//! Usage:
//!   clone-sim --cache-dir /tmp/clones --monitors epochs,rewards --max-epoch 100000
//!   clone-sim --config fig5.json --mdp self_nonself --out results/

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use clone_sim::{Array, MdpKind, Monitor, SimConfig, Simulator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clone-sim", about = "Simulate clonal selection against a binary MDP")]
struct Args {
    /// JSON configuration file; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Experiment cache directory (omit to disable caching)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Comma-separated observables to return
    #[arg(long, value_delimiter = ',', default_value = "epochs,rewards")]
    monitors: Vec<String>,

    /// Write every requested monitor to <OUT>/<monitor>.npy
    #[arg(long)]
    out: Option<PathBuf>,

    /// MDP variant: binary | self_nonself
    #[arg(long)]
    mdp: Option<String>,

    #[arg(long)]
    record_per: Option<u64>,

    #[arg(long)]
    max_epoch: Option<u64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Key states (binary) or pathogens (self_nonself)
    #[arg(long, visible_alias = "n-pathogen")]
    n_key_states: Option<usize>,

    #[arg(long)]
    dim_state: Option<usize>,

    #[arg(long)]
    dim_action: Option<usize>,

    #[arg(long)]
    infection_rate: Option<f64>,

    #[arg(long)]
    n_hidden: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    start_beta: Option<f64>,

    #[arg(long)]
    last_beta: Option<f64>,

    /// Only log warnings; no progress bar
    #[arg(long)]
    quiet: bool,
}

impl Args {
    fn sim_config(&self) -> Result<SimConfig> {
        let mut cfg = match &self.config {
            Some(path) => SimConfig::from_json_file(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?,
            None => SimConfig::default(),
        };
        if let Some(mdp) = &self.mdp {
            cfg.mdp = mdp.parse::<MdpKind>()?;
        }
        if let Some(v) = self.record_per {
            cfg.record_per = v;
        }
        if let Some(v) = self.max_epoch {
            cfg.max_epoch = v;
        }
        if let Some(v) = self.seed {
            cfg.seed = v;
        }
        if let Some(v) = self.n_key_states {
            cfg.n_key_states = v;
        }
        if let Some(v) = self.dim_state {
            cfg.dim_state = v;
        }
        if let Some(v) = self.dim_action {
            cfg.dim_action = v;
        }
        if let Some(v) = self.infection_rate {
            cfg.infection_rate = v;
        }
        if let Some(v) = self.n_hidden {
            cfg.n_hidden = v;
        }
        if let Some(v) = self.learning_rate {
            cfg.learning_rate = v;
        }
        if let Some(v) = self.start_beta {
            cfg.start_beta = v;
        }
        if let Some(v) = self.last_beta {
            cfg.last_beta = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// One-line description of an array for the terminal.
fn summarize(array: &Array) -> String {
    let data = array.data();
    if array.ndim() == 1 && data.len() <= 20 {
        let values: Vec<String> = data.iter().map(|v| format!("{:.4}", v)).collect();
        return format!("{:?} [{}]", array.shape(), values.join(", "));
    }
    if data.is_empty() {
        return format!("{:?} (empty)", array.shape());
    }
    let min = data.iter().copied().fold(f64::INFINITY, f64::min);
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    format!(
        "{:?} min={:.4} mean={:.4} max={:.4}",
        array.shape(),
        min,
        mean,
        max
    )
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.quiet);

    // Names first: a typo must fail before minutes of simulation.
    let monitors = Monitor::parse_all(&args.monitors)?;
    let config = args.sim_config()?;
    eprintln!("Fingerprint: {}", config.fingerprint());

    let arrays = match &args.cache_dir {
        Some(dir) => Simulator::new(dir)
            .with_progress(!args.quiet)
            .simulate(&monitors, &config)?,
        None => Simulator::uncached()
            .with_progress(!args.quiet)
            .simulate(&monitors, &config)?,
    };

    if let Some(out) = &args.out {
        fs::create_dir_all(out)
            .with_context(|| format!("Failed to create: {}", out.display()))?;
    }

    for (monitor, array) in monitors.iter().zip(&arrays) {
        println!("{:<12} {}", monitor.as_str(), summarize(array));
        if let Some(out) = &args.out {
            let path = out.join(format!("{}.npy", monitor.as_str()));
            array
                .save(&path)
                .with_context(|| format!("Failed to write: {}", path.display()))?;
        }
    }

    Ok(())
}
