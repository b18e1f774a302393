//! Clone Sim: clonal-selection learning against stochastic binary MDPs.
//!
//! An [`agent::Agent`] whose hidden units are clones of varying size plays an
//! [`mdp::Environment`]; rewards expand or contract clones. [`simulation::Simulator`]
//! memoizes whole runs in an experiment cache keyed by configuration fingerprint.

pub mod agent;
pub mod array;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod mdp;
pub mod simulation;
pub mod utils;

pub use array::Array;
pub use config::SimConfig;
pub use error::{Result, SimError};
pub use mdp::MdpKind;
pub use simulation::{Experiment, Monitor, Simulator};
