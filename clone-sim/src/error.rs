//! Error type for the simulation core.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while configuring, running or caching a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    /// MDP discriminator that names neither variant.
    #[error("unknown MDP variant '{0}' (expected 'binary' or 'self_nonself')")]
    UnknownMdp(String),

    /// Monitor name outside the recognized observable set.
    #[error("unknown monitor '{0}'")]
    UnknownMonitor(String),

    /// Structurally invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `Agent::learn` without a preceding `Agent::play` in the same step.
    #[error("learn called without a preceding play in the same step")]
    LearnWithoutPlay,

    /// Weight vector with no usable probability mass.
    #[error("cannot sample from a distribution with total mass {0}")]
    EmptyDistribution(f64),

    /// `agent_n` requested from a run that recorded nothing.
    #[error("run recorded no snapshots (max_epoch < record_per)")]
    NoSnapshots,

    /// Malformed array file.
    #[error("malformed array file {}: {message}", path.display())]
    Format { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Creates an `InvalidConfig` error.
    pub fn config(message: impl Into<String>) -> Self {
        SimError::InvalidConfig(message.into())
    }

    /// Creates a `Format` error for `path`.
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SimError::Format {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
