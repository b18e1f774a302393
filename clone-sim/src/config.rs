//! Simulation configuration and its cache fingerprint.

use std::fmt::Display;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cache::Fingerprint;
use crate::constants::*;
use crate::error::{Result, SimError};
use crate::mdp::MdpKind;

/// Every parameter that determines the outcome of a run.
///
/// Missing fields in a JSON configuration fall back to the defaults in
/// [`crate::constants`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Epochs between snapshots.
    pub record_per: u64,
    /// Number of agent-environment steps.
    pub max_epoch: u64,
    pub seed: u64,
    /// Key states (binary) or pathogens (self_nonself).
    pub n_key_states: usize,
    pub dim_state: usize,
    pub dim_action: usize,
    pub mdp: MdpKind,
    /// Only used by the self_nonself variant.
    pub infection_rate: f64,
    pub n_hidden: usize,
    pub learning_rate: f64,
    pub start_beta: f64,
    pub last_beta: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            record_per: DEFAULT_RECORD_PER,
            max_epoch: DEFAULT_MAX_EPOCH,
            seed: DEFAULT_SEED,
            n_key_states: DEFAULT_N_KEY_STATES,
            dim_state: DEFAULT_DIM_STATE,
            dim_action: DEFAULT_DIM_ACTION,
            mdp: MdpKind::default(),
            infection_rate: DEFAULT_INFECTION_RATE,
            n_hidden: DEFAULT_N_HIDDEN,
            learning_rate: DEFAULT_LEARNING_RATE,
            start_beta: DEFAULT_START_BETA,
            last_beta: DEFAULT_LAST_BETA,
        }
    }
}

impl SimConfig {
    /// Load a (possibly partial) configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Reject configurations no run can execute.
    pub fn validate(&self) -> Result<()> {
        if self.record_per == 0 {
            return Err(SimError::config("record_per must be at least 1"));
        }
        if self.max_epoch == 0 {
            return Err(SimError::config("max_epoch must be at least 1"));
        }
        if self.n_key_states == 0 {
            return Err(SimError::config("n_key_states must be at least 1"));
        }
        if self.dim_state == 0 || self.dim_action == 0 || self.n_hidden == 0 {
            return Err(SimError::config(format!(
                "dimensions must be positive (dim_state={}, dim_action={}, n_hidden={})",
                self.dim_state, self.dim_action, self.n_hidden
            )));
        }
        if !(0.0..=1.0).contains(&self.infection_rate) {
            return Err(SimError::config(format!(
                "infection_rate must lie in [0, 1], got {}",
                self.infection_rate
            )));
        }
        for (name, value) in [
            ("learning_rate", self.learning_rate),
            ("start_beta", self.start_beta),
            ("last_beta", self.last_beta),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::config(format!(
                    "{} must be finite and >= 0, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Number of snapshots this configuration records.
    pub fn snapshot_count(&self) -> usize {
        snapshot_count(self.max_epoch, self.record_per)
    }

    /// Deterministic cache key covering the version tag and every parameter.
    ///
    /// `INFECTION_RATE` only appears for the infection variant, which is the only
    /// one it affects.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut tokens = vec![
            token("VER", SIMULATOR_VERSION),
            token("RECORD_PER", self.record_per),
            token("MAX_EPOCH", self.max_epoch),
            token("SEED", self.seed),
            token("N_KEY_STATES", self.n_key_states),
            token("DIM_STATE", self.dim_state),
            token("DIM_ACTION", self.dim_action),
            token("MDP", self.mdp),
        ];
        if self.mdp == MdpKind::SelfNonself {
            tokens.push(token("INFECTION_RATE", self.infection_rate));
        }
        tokens.extend([
            token("N_HIDDEN", self.n_hidden),
            token("LEARNING_RATE", self.learning_rate),
            token("START_BETA", self.start_beta),
            token("LAST_BETA", self.last_beta),
        ]);
        Fingerprint::new(tokens.join(FINGERPRINT_SEPARATOR))
    }
}

fn token(key: &str, value: impl Display) -> String {
    format!("{}={}", key, value)
}
