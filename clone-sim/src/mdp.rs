//! The Environments: binary-vector MDPs the agent plays against.
//!
//! Both variants share a fixed optimal reward (the action width) and expose the
//! same four operations through [`Mdp`]. [`Environment`] closes the set so a run
//! can own either one without dynamic dispatch.
//!
//! - [`BinaryMdp`]: adversarial. After every action the environment moves to the
//!   key state whose optimal action the agent's action serves worst.
//! - [`SelfNonselfMdp`]: infection. A healthy state gets invaded by pathogens
//!   which the agent must clear by matching their action pattern.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::array::Array;
use crate::constants::{ARRAY_EXTENSION, MDP_KEY_ACTIONS_FILE, MDP_KEY_STATES_FILE};
use crate::error::{Result, SimError};
use crate::utils::{matching_score, random_bits, samp, samp_one};

/// Capability set of an MDP whose optimal reward does not depend on the state.
pub trait Mdp {
    /// Reset to a starting state and return its vector.
    fn initial_state<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<bool>;

    /// Transition after the agent played `action`; returns the new state vector.
    fn next_state<R: Rng + ?Sized>(&mut self, rng: &mut R, action: &[bool]) -> Vec<bool>;

    /// Reward for `action` in the current state.
    fn reward(&self, action: &[bool]) -> usize;

    /// Largest reward any action can earn.
    fn optimal_reward(&self) -> usize;

    /// The action earning `optimal_reward()` in the current state.
    fn optimal_action(&self) -> &[bool];

    /// State and action tables as 0/1 matrices (one row per entry).
    fn tables(&self) -> Result<(Array, Array)>;
}

// =============================================================================
// Variant selection
// =============================================================================

/// Which MDP a simulation runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MdpKind {
    #[default]
    Binary,
    SelfNonself,
}

impl MdpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MdpKind::Binary => "binary",
            MdpKind::SelfNonself => "self_nonself",
        }
    }
}

impl fmt::Display for MdpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MdpKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "binary" => Ok(MdpKind::Binary),
            "self_nonself" => Ok(MdpKind::SelfNonself),
            other => Err(SimError::UnknownMdp(other.to_string())),
        }
    }
}

/// Closed set of MDP variants owned by a simulation run.
#[derive(Debug, Clone)]
pub enum Environment {
    Binary(BinaryMdp),
    SelfNonself(SelfNonselfMdp),
}

impl Environment {
    /// Construct the `kind` variant with random tables drawn from `rng`.
    ///
    /// `n_key_states` is the key-state count for `Binary` and the pathogen count
    /// for `SelfNonself`.
    pub fn new<R: Rng + ?Sized>(
        rng: &mut R,
        kind: MdpKind,
        n_key_states: usize,
        dim_state: usize,
        dim_action: usize,
        infection_rate: f64,
    ) -> Result<Self> {
        Ok(match kind {
            MdpKind::Binary => {
                Environment::Binary(BinaryMdp::new(rng, n_key_states, dim_state, dim_action)?)
            }
            MdpKind::SelfNonself => Environment::SelfNonself(SelfNonselfMdp::new(
                rng,
                n_key_states,
                dim_state,
                dim_action,
                infection_rate,
            )?),
        })
    }

    pub fn kind(&self) -> MdpKind {
        match self {
            Environment::Binary(_) => MdpKind::Binary,
            Environment::SelfNonself(_) => MdpKind::SelfNonself,
        }
    }
}

impl Mdp for Environment {
    fn initial_state<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<bool> {
        match self {
            Environment::Binary(m) => m.initial_state(rng),
            Environment::SelfNonself(m) => m.initial_state(rng),
        }
    }

    fn next_state<R: Rng + ?Sized>(&mut self, rng: &mut R, action: &[bool]) -> Vec<bool> {
        match self {
            Environment::Binary(m) => m.next_state(rng, action),
            Environment::SelfNonself(m) => m.next_state(rng, action),
        }
    }

    fn reward(&self, action: &[bool]) -> usize {
        match self {
            Environment::Binary(m) => m.reward(action),
            Environment::SelfNonself(m) => m.reward(action),
        }
    }

    fn optimal_reward(&self) -> usize {
        match self {
            Environment::Binary(m) => m.optimal_reward(),
            Environment::SelfNonself(m) => m.optimal_reward(),
        }
    }

    fn optimal_action(&self) -> &[bool] {
        match self {
            Environment::Binary(m) => m.optimal_action(),
            Environment::SelfNonself(m) => m.optimal_action(),
        }
    }

    fn tables(&self) -> Result<(Array, Array)> {
        match self {
            Environment::Binary(m) => m.tables(),
            Environment::SelfNonself(m) => m.tables(),
        }
    }
}

fn check_dims(count: usize, dim_state: usize, dim_action: usize) -> Result<()> {
    if count == 0 || dim_state == 0 || dim_action == 0 {
        return Err(SimError::config(format!(
            "MDP dimensions must be positive (count={}, dim_state={}, dim_action={})",
            count, dim_state, dim_action
        )));
    }
    Ok(())
}

// =============================================================================
// Adversarial variant
// =============================================================================

/// Adversarial MDP over a fixed table of (key state, key action) pairs.
#[derive(Debug, Clone)]
pub struct BinaryMdp {
    key_states: Vec<Vec<bool>>,
    key_actions: Vec<Vec<bool>>,
    cur_state_idx: usize,

    pub n_key_states: usize,
    pub dim_state: usize,
    pub dim_action: usize,
}

impl BinaryMdp {
    pub fn new<R: Rng + ?Sized>(
        rng: &mut R,
        n_key_states: usize,
        dim_state: usize,
        dim_action: usize,
    ) -> Result<Self> {
        check_dims(n_key_states, dim_state, dim_action)?;
        let key_states = (0..n_key_states).map(|_| random_bits(rng, dim_state)).collect();
        let key_actions = (0..n_key_states).map(|_| random_bits(rng, dim_action)).collect();
        Ok(Self {
            key_states,
            key_actions,
            cur_state_idx: rng.gen_range(0..n_key_states),
            n_key_states,
            dim_state,
            dim_action,
        })
    }

    /// Index of the current key state.
    pub fn current_index(&self) -> usize {
        self.cur_state_idx
    }

    pub fn key_states(&self) -> &[Vec<bool>] {
        &self.key_states
    }

    pub fn key_actions(&self) -> &[Vec<bool>] {
        &self.key_actions
    }

    /// Write `mdp_key_states.npy` and `mdp_key_actions.npy` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let (states, actions) = self.tables()?;
        states.save(&dir.join(format!("{}.{}", MDP_KEY_STATES_FILE, ARRAY_EXTENSION)))?;
        actions.save(&dir.join(format!("{}.{}", MDP_KEY_ACTIONS_FILE, ARRAY_EXTENSION)))?;
        Ok(())
    }

    /// Per-key weakness of `action`: the number of bits set in `action` where the
    /// key's optimal action is clear.
    fn weakness(&self, action: &[bool]) -> Vec<f64> {
        self.key_actions
            .iter()
            .map(|key| {
                key.iter()
                    .zip(action)
                    .filter(|(k, a)| !**k && **a)
                    .count() as f64
            })
            .collect()
    }
}

impl Mdp for BinaryMdp {
    fn initial_state<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<bool> {
        self.cur_state_idx = rng.gen_range(0..self.n_key_states);
        self.key_states[self.cur_state_idx].clone()
    }

    /// Route toward the key states where `action` does worst.
    ///
    /// Weakness scores are normalized into probabilities, every candidate gets an
    /// independent Bernoulli draw, and the first candidate that fired wins. When
    /// nothing fires the first key state is chosen. When `action` is weak nowhere
    /// (all scores zero) the candidates are weighted uniformly.
    fn next_state<R: Rng + ?Sized>(&mut self, rng: &mut R, action: &[bool]) -> Vec<bool> {
        let weakness = self.weakness(action);
        let total: f64 = weakness.iter().sum();
        let probs: Vec<f64> = if total > 0.0 {
            weakness.iter().map(|w| w / total).collect()
        } else {
            vec![1.0 / self.n_key_states as f64; self.n_key_states]
        };
        let fired = samp(rng, &probs);
        self.cur_state_idx = fired.iter().position(|&f| f).unwrap_or(0);
        self.key_states[self.cur_state_idx].clone()
    }

    fn reward(&self, action: &[bool]) -> usize {
        matching_score(&self.key_actions[self.cur_state_idx], action)
    }

    fn optimal_reward(&self) -> usize {
        self.dim_action
    }

    fn optimal_action(&self) -> &[bool] {
        &self.key_actions[self.cur_state_idx]
    }

    fn tables(&self) -> Result<(Array, Array)> {
        Ok((
            Array::from_bits(&self.key_states, self.dim_state)?,
            Array::from_bits(&self.key_actions, self.dim_action)?,
        ))
    }
}

// =============================================================================
// Infection variant
// =============================================================================

/// Host condition of the infection MDP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Infection {
    Healthy,
    Infected { pathogen: usize },
}

/// Infection MDP: one healthy (state, action) pair and `n_pathogen` pathogenic ones.
#[derive(Debug, Clone)]
pub struct SelfNonselfMdp {
    nonpathogenic_state: Vec<bool>,
    nonpathogenic_action: Vec<bool>,
    pathogenic_states: Vec<Vec<bool>>,
    pathogenic_actions: Vec<Vec<bool>>,
    condition: Infection,

    pub n_pathogen: usize,
    pub infection_rate: f64,
    pub dim_state: usize,
    pub dim_action: usize,
}

impl SelfNonselfMdp {
    pub fn new<R: Rng + ?Sized>(
        rng: &mut R,
        n_pathogen: usize,
        dim_state: usize,
        dim_action: usize,
        infection_rate: f64,
    ) -> Result<Self> {
        check_dims(n_pathogen, dim_state, dim_action)?;
        if !(0.0..=1.0).contains(&infection_rate) {
            return Err(SimError::config(format!(
                "infection_rate must lie in [0, 1], got {}",
                infection_rate
            )));
        }
        let nonpathogenic_state = random_bits(rng, dim_state);
        let pathogenic_states = (0..n_pathogen).map(|_| random_bits(rng, dim_state)).collect();
        let nonpathogenic_action = random_bits(rng, dim_action);
        let pathogenic_actions = (0..n_pathogen).map(|_| random_bits(rng, dim_action)).collect();
        Ok(Self {
            nonpathogenic_state,
            nonpathogenic_action,
            pathogenic_states,
            pathogenic_actions,
            condition: Infection::Healthy,
            n_pathogen,
            infection_rate,
            dim_state,
            dim_action,
        })
    }

    pub fn condition(&self) -> Infection {
        self.condition
    }

    fn state_vector(&self) -> Vec<bool> {
        match self.condition {
            Infection::Healthy => self.nonpathogenic_state.clone(),
            Infection::Infected { pathogen } => self.pathogenic_states[pathogen].clone(),
        }
    }
}

impl Mdp for SelfNonselfMdp {
    /// The host starts healthy; the current condition is reported unchanged.
    fn initial_state<R: Rng + ?Sized>(&mut self, _rng: &mut R) -> Vec<bool> {
        self.state_vector()
    }

    fn next_state<R: Rng + ?Sized>(&mut self, rng: &mut R, action: &[bool]) -> Vec<bool> {
        self.condition = match self.condition {
            Infection::Infected { pathogen } => {
                // Clearance odds grow with how well the action matches the pathogen.
                let score = matching_score(&self.pathogenic_actions[pathogen], action);
                let eliminate_prob = score as f64 / self.dim_action as f64;
                if samp_one(rng, eliminate_prob) {
                    Infection::Healthy
                } else {
                    Infection::Infected { pathogen }
                }
            }
            Infection::Healthy => {
                if samp_one(rng, self.infection_rate) {
                    Infection::Infected {
                        pathogen: rng.gen_range(0..self.n_pathogen),
                    }
                } else {
                    Infection::Healthy
                }
            }
        };
        self.state_vector()
    }

    fn reward(&self, action: &[bool]) -> usize {
        matching_score(self.optimal_action(), action)
    }

    fn optimal_reward(&self) -> usize {
        self.dim_action
    }

    fn optimal_action(&self) -> &[bool] {
        match self.condition {
            Infection::Healthy => &self.nonpathogenic_action,
            Infection::Infected { pathogen } => &self.pathogenic_actions[pathogen],
        }
    }

    /// Healthy pair in row 0, pathogen pairs after it.
    fn tables(&self) -> Result<(Array, Array)> {
        let states: Vec<Vec<bool>> = std::iter::once(&self.nonpathogenic_state)
            .chain(&self.pathogenic_states)
            .cloned()
            .collect();
        let actions: Vec<Vec<bool>> = std::iter::once(&self.nonpathogenic_action)
            .chain(&self.pathogenic_actions)
            .cloned()
            .collect();
        Ok((
            Array::from_bits(&states, self.dim_state)?,
            Array::from_bits(&actions, self.dim_action)?,
        ))
    }
}
