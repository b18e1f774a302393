//! Experiment cache: recorded runs keyed by configuration fingerprint.
//!
//! A cache entry is a directory named after the fingerprint holding one `.npy`
//! file per observable. The directory's existence is the only hit signal, so it
//! is published with a rename once every file has been written.
//!
//! There is no locking. Two processes computing the same fingerprint at once
//! both miss, both compute, and the second rename fails with an I/O error.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::array::Array;
use crate::constants::ARRAY_EXTENSION;
use crate::error::Result;
use crate::simulation::Experiment;

/// Deterministic string identifying one experiment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key-value store of recorded experiments.
pub trait ArtifactStore {
    /// The stored experiment for `key`, or `None` on a miss.
    fn load(&self, key: &Fingerprint) -> Result<Option<Experiment>>;

    /// Persist `experiment` under `key`.
    fn store(&self, key: &Fingerprint, experiment: &Experiment) -> Result<()>;

    /// Return the stored experiment, or run `compute`, store and return its result.
    ///
    /// A failed `compute` stores nothing.
    fn get_or_compute<F>(&self, key: &Fingerprint, compute: F) -> Result<Experiment>
    where
        Self: Sized,
        F: FnOnce() -> Result<Experiment>,
    {
        if let Some(hit) = self.load(key)? {
            info!(fingerprint = %key, "cache hit");
            return Ok(hit);
        }
        info!(fingerprint = %key, "cache miss, running simulation");
        let experiment = compute()?;
        self.store(key, &experiment)?;
        Ok(experiment)
    }
}

/// Store that remembers nothing: every lookup misses, every store is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl ArtifactStore for NullStore {
    fn load(&self, _key: &Fingerprint) -> Result<Option<Experiment>> {
        Ok(None)
    }

    fn store(&self, _key: &Fingerprint, _experiment: &Experiment) -> Result<()> {
        Ok(())
    }
}

/// Filesystem store: `<root>/<fingerprint>/<observable>.npy`.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the entry for `key`.
    pub fn entry_dir(&self, key: &Fingerprint) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Whether a complete entry for `key` exists.
    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.entry_dir(key).is_dir()
    }

    fn staging_dir(&self, key: &Fingerprint) -> PathBuf {
        self.root
            .join(format!(".{}.partial-{}", key.as_str(), std::process::id()))
    }
}

fn array_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{}.{}", stem, ARRAY_EXTENSION))
}

impl ArtifactStore for DirStore {
    fn load(&self, key: &Fingerprint) -> Result<Option<Experiment>> {
        let dir = self.entry_dir(key);
        if !dir.is_dir() {
            return Ok(None);
        }
        debug!(dir = %dir.display(), "loading cached arrays");
        let experiment = Experiment::from_arrays(|stem| Array::load(&array_path(&dir, stem)))?;
        Ok(Some(experiment))
    }

    fn store(&self, key: &Fingerprint, experiment: &Experiment) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let staging = self.staging_dir(key);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir(&staging)?;

        let target = self.entry_dir(key);
        if let Err(e) = publish(&staging, &target, experiment) {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!(dir = %staging.display(), error = %cleanup, "failed to remove staging dir");
            }
            return Err(e);
        }
        info!(dir = %target.display(), "cached experiment");
        Ok(())
    }
}

/// Write every array into `staging`, then rename it to `target`.
fn publish(staging: &Path, target: &Path, experiment: &Experiment) -> Result<()> {
    for (stem, array) in experiment.arrays() {
        array.save(&array_path(staging, stem))?;
    }
    fs::rename(staging, target)?;
    Ok(())
}
