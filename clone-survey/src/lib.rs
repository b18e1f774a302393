//! Clone Survey: multi-run statistics over clone-sim experiments.
//!
//! Every run goes through [`clone_sim::Simulator`], so repeated surveys
//! with the same cache directory only simulate what is missing.

pub mod common;
pub mod stats;
pub mod sweep;
