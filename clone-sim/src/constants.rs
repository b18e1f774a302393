//! Constants for the clonal-selection simulation.
//!
//! Default configuration mirrors the reference experiment:
//! 30 key states, 100-bit states, 20-bit actions, 5000 clones,
//! 100k epochs annealed from beta = 1 to beta = 20.

// =============================================================================
// Cache
// =============================================================================

/// Version tag baked into every experiment fingerprint.
/// Bump it whenever the numerical model changes so stale cache entries miss.
pub const SIMULATOR_VERSION: &str = "1.0.0";

/// Separator between `KEY=value` tokens of a fingerprint.
pub const FINGERPRINT_SEPARATOR: &str = "-";

/// Array file extension used inside a cache entry.
pub const ARRAY_EXTENSION: &str = "npy";

/// Observable file stems stored in every cache entry.
pub const EPOCHS_FILE: &str = "epochs";
pub const REWARDS_FILE: &str = "rewards";
pub const AGENT_NS_FILE: &str = "agent_ns";
pub const AGENT_W_FILE: &str = "agent_w";
pub const AGENT_U_FILE: &str = "agent_u";
pub const KEY_STATES_FILE: &str = "key_states";
pub const KEY_ACTIONS_FILE: &str = "key_actions";
/// Final clone sizes written by `Agent::save`.
pub const AGENT_N_FILE: &str = "agent_n";
pub const MDP_KEY_STATES_FILE: &str = "mdp_key_states";
pub const MDP_KEY_ACTIONS_FILE: &str = "mdp_key_actions";

// =============================================================================
// Recording
// =============================================================================

/// Snapshot interval in epochs.
pub const DEFAULT_RECORD_PER: u64 = 1000;

/// Total number of agent-environment interaction steps.
pub const DEFAULT_MAX_EPOCH: u64 = 100_000;

/// Seed of the per-run random generator.
pub const DEFAULT_SEED: u64 = 0;

// =============================================================================
// Environment
// =============================================================================

/// Number of key states (adversarial) or pathogens (infection).
pub const DEFAULT_N_KEY_STATES: usize = 30;

/// Bits per state vector.
pub const DEFAULT_DIM_STATE: usize = 100;

/// Bits per action vector. Also the optimal reward.
pub const DEFAULT_DIM_ACTION: usize = 20;

/// Per-step probability that a healthy host gets infected.
pub const DEFAULT_INFECTION_RATE: f64 = 0.5;

// =============================================================================
// Agent
// =============================================================================

/// Number of hidden units, i.e. clones.
pub const DEFAULT_N_HIDDEN: usize = 5000;

/// Step size of the multiplicative clone-size update.
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Inverse temperature at epoch 0.
pub const DEFAULT_START_BETA: f64 = 1.0;

/// Inverse temperature reached at epoch = max_epoch.
pub const DEFAULT_LAST_BETA: f64 = 20.0;

/// Initial size of every clone.
pub const INITIAL_CLONE_SIZE: f64 = 1.0;

/// He-style init gain: weights ~ Normal(0, sqrt(WEIGHT_INIT_GAIN / fan_in)).
pub const WEIGHT_INIT_GAIN: f64 = 2.0;

/// Linearly annealed inverse temperature for `epoch` of `max_epoch`.
pub fn annealed_beta(start_beta: f64, last_beta: f64, epoch: u64, max_epoch: u64) -> f64 {
    if max_epoch == 0 {
        return start_beta;
    }
    start_beta + (last_beta - start_beta) * epoch as f64 / max_epoch as f64
}

/// Number of snapshots a run of `max_epoch` steps records.
pub fn snapshot_count(max_epoch: u64, record_per: u64) -> usize {
    if record_per == 0 {
        return 0;
    }
    (max_epoch / record_per) as usize
}
