//! The Simulation: drives the Agent against an Environment and records observables.
//!
//! [`Simulation`] is one seeded run. [`Simulator`] is the cache-aware entry point
//! that maps a configuration to its recorded [`Experiment`] and hands back the
//! requested monitors.

use std::fmt;
use std::str::FromStr;

use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::agent::Agent;
use crate::array::Array;
use crate::cache::{ArtifactStore, DirStore, NullStore};
use crate::config::SimConfig;
use crate::constants::*;
use crate::error::{Result, SimError};
use crate::mdp::{Environment, Mdp};

// =============================================================================
// Monitors
// =============================================================================

/// An observable a caller can request from a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Monitor {
    /// Epoch index of every snapshot.
    Epochs,
    /// Normalized reward of every snapshot.
    Rewards,
    /// Clone-size vector of every snapshot.
    AgentNs,
    /// Clone-size vector of the last snapshot.
    AgentN,
    AgentW,
    AgentU,
    KeyStates,
    KeyActions,
}

impl Monitor {
    pub const ALL: [Monitor; 8] = [
        Monitor::Epochs,
        Monitor::Rewards,
        Monitor::AgentNs,
        Monitor::AgentN,
        Monitor::AgentW,
        Monitor::AgentU,
        Monitor::KeyStates,
        Monitor::KeyActions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Monitor::Epochs => "epochs",
            Monitor::Rewards => "rewards",
            Monitor::AgentNs => "agent_ns",
            Monitor::AgentN => "agent_n",
            Monitor::AgentW => "agent_w",
            Monitor::AgentU => "agent_u",
            Monitor::KeyStates => "key_states",
            Monitor::KeyActions => "key_actions",
        }
    }

    /// Parse every name, failing on the first unrecognized one.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Monitor>> {
        names.iter().map(|n| n.as_ref().parse()).collect()
    }
}

impl fmt::Display for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Monitor {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        Monitor::ALL
            .iter()
            .find(|m| m.as_str() == s)
            .copied()
            .ok_or_else(|| SimError::UnknownMonitor(s.to_string()))
    }
}

// =============================================================================
// Recorded experiment
// =============================================================================

/// Everything a finished run leaves behind. This is what the cache stores.
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    /// Shape: [snapshots]
    pub epochs: Array,
    /// Shape: [snapshots], each in [0, 1]
    pub rewards: Array,
    /// Shape: [snapshots][n_hidden]
    pub agent_ns: Array,
    /// Shape: [n_hidden][dim_state]
    pub agent_w: Array,
    /// Shape: [dim_action][n_hidden]
    pub agent_u: Array,
    pub key_states: Array,
    pub key_actions: Array,
}

impl Experiment {
    /// Arrays paired with their cache file stems.
    pub fn arrays(&self) -> [(&'static str, &Array); 7] {
        [
            (EPOCHS_FILE, &self.epochs),
            (REWARDS_FILE, &self.rewards),
            (AGENT_NS_FILE, &self.agent_ns),
            (AGENT_W_FILE, &self.agent_w),
            (AGENT_U_FILE, &self.agent_u),
            (KEY_STATES_FILE, &self.key_states),
            (KEY_ACTIONS_FILE, &self.key_actions),
        ]
    }

    /// Rebuild from a loader that maps file stems to arrays.
    pub fn from_arrays<F>(mut load: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<Array>,
    {
        Ok(Self {
            epochs: load(EPOCHS_FILE)?,
            rewards: load(REWARDS_FILE)?,
            agent_ns: load(AGENT_NS_FILE)?,
            agent_w: load(AGENT_W_FILE)?,
            agent_u: load(AGENT_U_FILE)?,
            key_states: load(KEY_STATES_FILE)?,
            key_actions: load(KEY_ACTIONS_FILE)?,
        })
    }

    pub fn monitor(&self, monitor: Monitor) -> Result<Array> {
        Ok(match monitor {
            Monitor::Epochs => self.epochs.clone(),
            Monitor::Rewards => self.rewards.clone(),
            Monitor::AgentNs => self.agent_ns.clone(),
            Monitor::AgentN => self.agent_ns.last_row().ok_or(SimError::NoSnapshots)?,
            Monitor::AgentW => self.agent_w.clone(),
            Monitor::AgentU => self.agent_u.clone(),
            Monitor::KeyStates => self.key_states.clone(),
            Monitor::KeyActions => self.key_actions.clone(),
        })
    }

    /// Requested monitors, in request order.
    pub fn select(&self, monitors: &[Monitor]) -> Result<Vec<Array>> {
        monitors.iter().map(|&m| self.monitor(m)).collect()
    }
}

// =============================================================================
// One run
// =============================================================================

/// A single seeded agent-environment run.
#[derive(Debug)]
pub struct Simulation<R: Rng = ChaCha8Rng> {
    config: SimConfig,
    rng: R,
    env: Environment,
    agent: Agent,
    state: Vec<bool>,

    /// Steps taken so far.
    pub epoch: u64,

    epochs: Vec<f64>,
    rewards: Vec<f64>,
    agent_ns: Vec<Vec<f64>>,
}

impl Simulation<ChaCha8Rng> {
    /// Seed a fresh generator from `config.seed` and build the run.
    pub fn new(config: &SimConfig) -> Result<Self> {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(config.seed))
    }
}

impl<R: Rng> Simulation<R> {
    /// Build the run around `rng`. The environment draws first, then the agent,
    /// then the initial state.
    pub fn with_rng(config: &SimConfig, mut rng: R) -> Result<Self> {
        config.validate()?;
        let mut env = Environment::new(
            &mut rng,
            config.mdp,
            config.n_key_states,
            config.dim_state,
            config.dim_action,
            config.infection_rate,
        )?;
        let agent = Agent::new(&mut rng, config.n_hidden, config.dim_state, config.dim_action)?;
        let state = env.initial_state(&mut rng);

        let capacity = config.snapshot_count();
        Ok(Self {
            config: config.clone(),
            rng,
            env,
            agent,
            state,
            epoch: 0,
            epochs: Vec::with_capacity(capacity),
            rewards: Vec::with_capacity(capacity),
            agent_ns: Vec::with_capacity(capacity),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// State the agent will see on the next step.
    pub fn state(&self) -> &[bool] {
        &self.state
    }

    /// Inverse temperature for the current epoch.
    pub fn beta(&self) -> f64 {
        annealed_beta(
            self.config.start_beta,
            self.config.last_beta,
            self.epoch,
            self.config.max_epoch,
        )
    }

    /// Snapshots recorded so far.
    pub fn snapshots(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_finished(&self) -> bool {
        self.epoch >= self.config.max_epoch
    }

    /// Execute one step and return its reward normalized by the optimal reward.
    ///
    /// 1. PLAY: agent picks an action for the current state
    /// 2. REWARD: scored against the current state, before it changes
    /// 3. LEARN: clone sizes updated from the reward
    /// 4. TRANSITION: environment moves to the next state
    /// 5. RECORD: snapshot when the epoch count hits a multiple of record_per
    pub fn step(&mut self) -> Result<f64> {
        let beta = self.beta();
        let action = self.agent.play(&mut self.rng, &self.state, beta);
        let reward = self.env.reward(&action);
        self.agent
            .learn(&self.state, &action, reward as f64, self.config.learning_rate)?;
        self.state = self.env.next_state(&mut self.rng, &action);
        self.epoch += 1;

        let normalized = reward as f64 / self.env.optimal_reward() as f64;
        if self.epoch % self.config.record_per == 0 {
            debug!(epoch = self.epoch, reward = normalized, "snapshot");
            self.epochs.push(self.epoch as f64);
            self.rewards.push(normalized);
            self.agent_ns.push(self.agent.n().to_vec());
        }
        Ok(normalized)
    }

    /// Step until `max_epoch`, ticking `progress` once per step.
    pub fn run(&mut self, progress: &ProgressBar) -> Result<()> {
        while !self.is_finished() {
            self.step()?;
            progress.inc(1);
        }
        Ok(())
    }

    /// Package the recorded observables and final parameters.
    pub fn into_experiment(self) -> Result<Experiment> {
        let (key_states, key_actions) = self.env.tables()?;
        Ok(Experiment {
            epochs: Array::vector(self.epochs),
            rewards: Array::vector(self.rewards),
            agent_ns: Array::from_rows(&self.agent_ns, self.config.n_hidden)?,
            agent_w: self.agent.w().clone(),
            agent_u: self.agent.u().clone(),
            key_states,
            key_actions,
        })
    }
}

// =============================================================================
// Cache-aware entry point
// =============================================================================

/// Runs configurations through an [`ArtifactStore`].
#[derive(Debug, Clone)]
pub struct Simulator<S: ArtifactStore = DirStore> {
    store: S,
    progress: bool,
}

impl Simulator<DirStore> {
    /// Simulator caching under `cache_dir`.
    pub fn new(cache_dir: impl Into<std::path::PathBuf>) -> Self {
        Self::with_store(DirStore::new(cache_dir))
    }
}

impl Simulator<NullStore> {
    /// Simulator that always computes and never persists.
    pub fn uncached() -> Self {
        Self::with_store(NullStore)
    }
}

impl<S: ArtifactStore> Simulator<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            progress: false,
        }
    }

    /// Draw a progress bar on stderr during fresh runs.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Requested monitors for `config`, loaded from the store or freshly computed.
    pub fn simulate(&self, monitors: &[Monitor], config: &SimConfig) -> Result<Vec<Array>> {
        self.experiment(config)?.select(monitors)
    }

    /// Like [`Simulator::simulate`], with monitors given by name. Every name is
    /// checked before any simulation or cache work starts.
    pub fn simulate_named<N: AsRef<str>>(
        &self,
        monitors: &[N],
        config: &SimConfig,
    ) -> Result<Vec<Array>> {
        let monitors = Monitor::parse_all(monitors)?;
        self.simulate(&monitors, config)
    }

    /// The full recorded experiment for `config`.
    pub fn experiment(&self, config: &SimConfig) -> Result<Experiment> {
        config.validate()?;
        let key = config.fingerprint();
        self.store.get_or_compute(&key, || self.run_fresh(config))
    }

    fn run_fresh(&self, config: &SimConfig) -> Result<Experiment> {
        info!(
            mdp = %config.mdp,
            seed = config.seed,
            max_epoch = config.max_epoch,
            n_hidden = config.n_hidden,
            "starting simulation"
        );
        let progress = if self.progress {
            progress_bar(config.max_epoch)
        } else {
            ProgressBar::hidden()
        };

        let mut sim = Simulation::new(config)?;
        sim.run(&progress)?;
        progress.finish_and_clear();

        let experiment = sim.into_experiment()?;
        info!(
            snapshots = experiment.epochs.len(),
            final_reward = experiment.rewards.data().last().copied().unwrap_or(f64::NAN),
            "simulation finished"
        );
        Ok(experiment)
    }
}

/// Run `config` without any cache.
pub fn run_fresh(config: &SimConfig) -> Result<Experiment> {
    let mut sim = Simulation::new(config)?;
    sim.run(&ProgressBar::hidden())?;
    sim.into_experiment()
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
