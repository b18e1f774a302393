//! Multi-run sweeps over `Simulator::simulate`.
//!
//! Each sweep varies one thing (seed or pathogen count) around a base
//! configuration and reduces the runs to the arrays a figure needs.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clone_sim::cache::ArtifactStore;
use clone_sim::utils::multinomial;
use clone_sim::{Array, Monitor, SimConfig, Simulator};
use rand::Rng;
use tracing::info;

use crate::stats::{column_percentile, rank_sorted};

fn save(dir: &Path, name: &str, array: &Array) -> Result<()> {
    let path = dir.join(format!("{}.npy", name));
    array
        .save(&path)
        .with_context(|| format!("Failed to write: {}", path.display()))
}

// =============================================================================
// Reward curve
// =============================================================================

/// Interquartile band of normalized reward across seeds.
#[derive(Debug, Clone)]
pub struct RewardBand {
    pub epochs: Vec<f64>,
    pub low: Vec<f64>,
    pub median: Vec<f64>,
    pub high: Vec<f64>,
    pub runs: usize,
}

impl RewardBand {
    /// Write `epochs`, `rewards_p25`, `rewards_median`, `rewards_p75` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        save(dir, "epochs", &Array::vector(self.epochs.clone()))?;
        save(dir, "rewards_p25", &Array::vector(self.low.clone()))?;
        save(dir, "rewards_median", &Array::vector(self.median.clone()))?;
        save(dir, "rewards_p75", &Array::vector(self.high.clone()))?;
        Ok(())
    }
}

/// Run `base` once per seed in `0..runs` and reduce rewards to quartiles per snapshot.
pub fn reward_curve<S: ArtifactStore>(
    sim: &Simulator<S>,
    base: &SimConfig,
    runs: u64,
) -> Result<RewardBand> {
    if runs == 0 {
        bail!("reward curve needs at least one run");
    }
    let mut epochs = Vec::new();
    let mut rewards = Vec::with_capacity(runs as usize);
    for seed in 0..runs {
        info!(seed, "reward curve run");
        let cfg = SimConfig { seed, ..base.clone() };
        let mut out = sim.simulate(&[Monitor::Epochs, Monitor::Rewards], &cfg)?;
        let r = out.pop().map(Array::into_data).unwrap_or_default();
        let e = out.pop().map(Array::into_data).unwrap_or_default();
        epochs = e;
        rewards.push(r);
    }
    Ok(RewardBand {
        low: column_percentile(&rewards, 25.0),
        median: column_percentile(&rewards, 50.0),
        high: column_percentile(&rewards, 75.0),
        epochs,
        runs: rewards.len(),
    })
}

// =============================================================================
// Clone-size ranks
// =============================================================================

/// One full clone-size trajectory plus final rank distributions of other seeds.
#[derive(Debug, Clone)]
pub struct CloneRanks {
    /// Snapshot epochs of the trajectory run.
    pub epochs: Array,
    /// Clone sizes per snapshot of the trajectory run. Shape: [snapshots][n_hidden]
    pub trajectory: Array,
    /// Final clone sizes of the trajectory run, largest first.
    pub highlighted: Vec<f64>,
    /// Final clone sizes of every other seed, largest first. Shape: [seeds][n_hidden]
    pub others: Array,
}

impl CloneRanks {
    /// Write `epochs`, `agent_ns`, `rank_highlighted`, `rank_others` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        save(dir, "epochs", &self.epochs)?;
        save(dir, "agent_ns", &self.trajectory)?;
        save(dir, "rank_highlighted", &Array::vector(self.highlighted.clone()))?;
        save(dir, "rank_others", &self.others)?;
        Ok(())
    }
}

/// Trajectory of seed 0 under `base`, plus final ranks for seeds `1..=others`.
///
/// The other seeds only need their last snapshot, so they run with
/// `record_per = max_epoch`.
pub fn clone_ranks<S: ArtifactStore>(
    sim: &Simulator<S>,
    base: &SimConfig,
    others: u64,
) -> Result<CloneRanks> {
    let cfg = SimConfig { seed: 0, ..base.clone() };
    let mut out = sim.simulate(&[Monitor::Epochs, Monitor::AgentNs], &cfg)?;
    let trajectory = out.pop().context("missing agent_ns")?;
    let epochs = out.pop().context("missing epochs")?;
    let last = trajectory
        .last_row()
        .context("trajectory run recorded no snapshots")?;
    let highlighted = rank_sorted(last.data());

    let mut ranks = Vec::with_capacity(others as usize);
    for seed in 1..=others {
        info!(seed, "clone rank run");
        let cfg = SimConfig {
            seed,
            record_per: base.max_epoch,
            ..base.clone()
        };
        let agent_n = sim.simulate(&[Monitor::AgentN], &cfg)?.remove(0);
        ranks.push(rank_sorted(agent_n.data()));
    }

    Ok(CloneRanks {
        epochs,
        trajectory,
        highlighted,
        others: Array::from_rows(&ranks, base.n_hidden)?,
    })
}

// =============================================================================
// Repertoire samples
// =============================================================================

/// Simulated sequencing readout of one run's final repertoire.
#[derive(Debug, Clone)]
pub struct RepertoireSample {
    /// Short name used for the output file.
    pub label: String,
    /// Observed clone counts, largest first. Sums to the sample size.
    pub counts: Vec<f64>,
}

/// Draw `total` cells from the clone-size vector `agent_n` and return their
/// clone counts largest first.
pub fn sample_repertoire<R: Rng + ?Sized>(
    rng: &mut R,
    agent_n: &[f64],
    total: u64,
) -> Result<Vec<f64>> {
    let counts = multinomial(rng, agent_n, total)?;
    let counts: Vec<f64> = counts.into_iter().map(|c| c as f64).collect();
    Ok(rank_sorted(&counts))
}

/// One run per pathogen count (run `i` uses seed `i`), each sequenced with
/// `total` cells.
pub fn pathogen_sweep<S: ArtifactStore, R: Rng + ?Sized>(
    sim: &Simulator<S>,
    base: &SimConfig,
    pathogen_counts: &[usize],
    total: u64,
    rng: &mut R,
) -> Result<Vec<RepertoireSample>> {
    let mut samples = Vec::with_capacity(pathogen_counts.len());
    for (idx, &n_pathogen) in pathogen_counts.iter().enumerate() {
        info!(n_pathogen, seed = idx, "repertoire run");
        let cfg = SimConfig {
            seed: idx as u64,
            n_key_states: n_pathogen,
            record_per: base.max_epoch,
            ..base.clone()
        };
        let agent_n = sim.simulate(&[Monitor::AgentN], &cfg)?.remove(0);
        samples.push(RepertoireSample {
            label: format!("p{}", n_pathogen),
            counts: sample_repertoire(rng, agent_n.data(), total)?,
        });
    }
    Ok(samples)
}

/// One run per seed in `0..runs`, each sequenced with `total` cells.
pub fn seed_sweep<S: ArtifactStore, R: Rng + ?Sized>(
    sim: &Simulator<S>,
    base: &SimConfig,
    runs: u64,
    total: u64,
    rng: &mut R,
) -> Result<Vec<RepertoireSample>> {
    let mut samples = Vec::with_capacity(runs as usize);
    for seed in 0..runs {
        info!(seed, "repertoire run");
        let cfg = SimConfig {
            seed,
            record_per: base.max_epoch,
            ..base.clone()
        };
        let agent_n = sim.simulate(&[Monitor::AgentN], &cfg)?.remove(0);
        samples.push(RepertoireSample {
            label: format!("seed{}", seed),
            counts: sample_repertoire(rng, agent_n.data(), total)?,
        });
    }
    Ok(samples)
}

/// Write every sample as `sample_<label>.npy` into `dir`.
pub fn save_samples(dir: &Path, samples: &[RepertoireSample]) -> Result<()> {
    fs::create_dir_all(dir)?;
    for sample in samples {
        save(
            dir,
            &format!("sample_{}", sample.label),
            &Array::vector(sample.counts.clone()),
        )?;
    }
    Ok(())
}
