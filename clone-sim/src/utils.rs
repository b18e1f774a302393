//! Numeric primitives shared by the agent and the environments.
//!
//! Every random draw takes the caller's generator explicitly so a whole run
//! stays reproducible from one seed.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::error::{Result, SimError};

/// Logistic sigmoid.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// One Bernoulli(p) draw. `p` outside [0, 1] saturates instead of panicking.
pub fn samp_one<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.gen::<f64>() < p
}

/// Independent Bernoulli draw for every probability in `probs`.
pub fn samp<R: Rng + ?Sized>(rng: &mut R, probs: &[f64]) -> Vec<bool> {
    probs.iter().map(|&p| samp_one(rng, p)).collect()
}

/// Number of positions where `a` and `b` agree (bitwise XNOR popcount).
///
/// # Examples
///
/// ```
/// use clone_sim::utils::matching_score;
///
/// let a = [true, false, true, true];
/// assert_eq!(matching_score(&a, &a), 4);
/// assert_eq!(matching_score(&a, &[false, true, false, false]), 0);
/// ```
///
/// # Panics
///
/// If `a` and `b` differ in length.
pub fn matching_score(a: &[bool], b: &[bool]) -> usize {
    assert_eq!(a.len(), b.len(), "matching_score on unequal lengths");
    a.iter().zip(b).filter(|(x, y)| x == y).count()
}

/// Uniformly random binary vector of length `len`.
pub fn random_bits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Vec<bool> {
    (0..len).map(|_| rng.gen::<bool>()).collect()
}

/// Simulated sequencing sample of a clone-size vector.
///
/// Normalizes `dist` into a categorical distribution, draws `total_num`
/// categories from it and returns the occurrence count of every category that
/// was drawn at least once, in category order. The counts sum to `total_num`.
pub fn multinomial<R: Rng + ?Sized>(
    rng: &mut R,
    dist: &[f64],
    total_num: u64,
) -> Result<Vec<u64>> {
    let mass: f64 = dist.iter().sum();
    if !(mass.is_finite() && mass > 0.0) || dist.iter().any(|&w| w < 0.0) {
        return Err(SimError::EmptyDistribution(mass));
    }
    let index = WeightedIndex::new(dist).map_err(|_| SimError::EmptyDistribution(mass))?;

    let mut counts = vec![0u64; dist.len()];
    for _ in 0..total_num {
        counts[index.sample(rng)] += 1;
    }
    Ok(counts.into_iter().filter(|&c| c > 0).collect())
}

/// `m · v` for a row-major `rows x v.len()` matrix.
pub fn mat_vec(m: &[f64], rows: usize, v: &[f64]) -> Vec<f64> {
    let cols = v.len();
    debug_assert_eq!(m.len(), rows * cols);
    m.chunks_exact(cols)
        .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
        .collect()
}

/// `mᵀ · v` for a row-major `v.len() x cols` matrix.
pub fn mat_t_vec(m: &[f64], cols: usize, v: &[f64]) -> Vec<f64> {
    debug_assert_eq!(m.len(), v.len() * cols);
    let mut out = vec![0.0; cols];
    for (row, &scale) in m.chunks_exact(cols).zip(v) {
        if scale == 0.0 {
            continue;
        }
        for (o, a) in out.iter_mut().zip(row) {
            *o += a * scale;
        }
    }
    out
}

/// 0/1 encoding of a binary vector.
pub fn bits_to_f64(bits: &[bool]) -> Vec<f64> {
    bits.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect()
}
