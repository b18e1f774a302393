//! The Agent: a repertoire of clones deciding on binary actions.
//!
//! Two fixed random projections around a layer of clones:
//! - `w`: state → hidden (n_hidden x dim_state), sigmoid activation
//! - `n`: clone sizes, scaling each hidden unit (the only learned quantity)
//! - `u`: hidden → action logits (dim_action x n_hidden)
//!
//! Learning is clonal selection: each clone grows or shrinks multiplicatively
//! with the reward prediction error it contributed to. Clone sizes never go
//! below zero.

use std::path::Path;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::array::Array;
use crate::constants::*;
use crate::error::{Result, SimError};
use crate::utils::{bits_to_f64, mat_t_vec, mat_vec, samp, sigmoid};

/// Hidden activations from the last `play`, consumed by `learn`.
#[derive(Debug, Clone)]
struct Activation {
    /// sigmoid(w · state)
    h: Vec<f64>,
    /// n ⊙ h
    nh: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Agent {
    /// Clone sizes. Shape: [n_hidden]. Every element >= 0.
    n: Vec<f64>,

    /// State → hidden projection. Shape: [n_hidden][dim_state]
    w: Array,

    /// Hidden → action projection. Shape: [dim_action][n_hidden]
    u: Array,

    last: Option<Activation>,

    pub n_hidden: usize,
    pub dim_state: usize,
    pub dim_action: usize,
}

impl Agent {
    /// Create an agent with unit clone sizes and Normal(0, sqrt(2 / fan_in)) projections.
    pub fn new<R: Rng + ?Sized>(
        rng: &mut R,
        n_hidden: usize,
        dim_state: usize,
        dim_action: usize,
    ) -> Result<Self> {
        if n_hidden == 0 || dim_state == 0 || dim_action == 0 {
            return Err(SimError::config(format!(
                "agent dimensions must be positive (n_hidden={}, dim_state={}, dim_action={})",
                n_hidden, dim_state, dim_action
            )));
        }

        let w_init = he_normal(rng, n_hidden * dim_state, dim_state)?;
        let w = Array::matrix(n_hidden, dim_state, w_init)?;
        let u_init = he_normal(rng, dim_action * n_hidden, n_hidden)?;
        let u = Array::matrix(dim_action, n_hidden, u_init)?;

        Ok(Self {
            n: vec![INITIAL_CLONE_SIZE; n_hidden],
            w,
            u,
            last: None,
            n_hidden,
            dim_state,
            dim_action,
        })
    }

    /// Build an agent from explicit parameters.
    pub fn from_parts(n: Vec<f64>, w: Array, u: Array) -> Result<Self> {
        let n_hidden = n.len();
        let (w_shape, u_shape) = (w.shape().to_vec(), u.shape().to_vec());
        match (w_shape.as_slice(), u_shape.as_slice()) {
            ([wh, ds], [da, uh]) if *wh == n_hidden && *uh == n_hidden => Ok(Self {
                n,
                w,
                u,
                last: None,
                n_hidden,
                dim_state: *ds,
                dim_action: *da,
            }),
            _ => Err(SimError::config(format!(
                "inconsistent agent shapes: n=[{}], w={:?}, u={:?}",
                n_hidden, w_shape, u_shape
            ))),
        }
    }

    /// Choose a binary action for `state` at inverse temperature `beta`.
    ///
    /// p = sigmoid(beta · u · (n ⊙ sigmoid(w · state))), one Bernoulli draw per bit.
    /// Remembers the hidden activations for the following `learn`.
    pub fn play<R: Rng + ?Sized>(&mut self, rng: &mut R, state: &[bool], beta: f64) -> Vec<bool> {
        debug_assert_eq!(state.len(), self.dim_state);
        let s = bits_to_f64(state);

        let h: Vec<f64> = mat_vec(self.w.data(), self.n_hidden, &s)
            .into_iter()
            .map(sigmoid)
            .collect();
        let nh: Vec<f64> = self.n.iter().zip(&h).map(|(n, h)| n * h).collect();

        let probs: Vec<f64> = mat_vec(self.u.data(), self.dim_action, &nh)
            .into_iter()
            .map(|logit| sigmoid(beta * logit))
            .collect();
        let action = samp(rng, &probs);

        self.last = Some(Activation { h, nh });
        action
    }

    /// Clonal selection update for the step whose `play` produced `action`.
    ///
    /// q      = (u · (n ⊙ h)) · action
    /// lambda = (reward - q) ⊙ h ⊙ (uᵀ · action)
    /// n     += learning_rate · n ⊙ lambda, then floored at zero.
    pub fn learn(
        &mut self,
        state: &[bool],
        action: &[bool],
        reward: f64,
        learning_rate: f64,
    ) -> Result<()> {
        debug_assert_eq!(state.len(), self.dim_state);
        debug_assert_eq!(action.len(), self.dim_action);
        let Activation { h, nh } = self.last.take().ok_or(SimError::LearnWithoutPlay)?;

        let a = bits_to_f64(action);
        let q: f64 = mat_vec(self.u.data(), self.dim_action, &nh)
            .iter()
            .zip(&a)
            .map(|(logit, a)| logit * a)
            .sum();
        let back = mat_t_vec(self.u.data(), self.n_hidden, &a);
        let error = reward - q;

        for ((n, h), b) in self.n.iter_mut().zip(&h).zip(&back) {
            *n += learning_rate * *n * error * h * b;
            // NaN fails the comparison too, so it is floored along with negatives.
            if !(*n >= 0.0) {
                *n = 0.0;
            }
        }
        Ok(())
    }

    /// Current clone sizes.
    pub fn n(&self) -> &[f64] {
        &self.n
    }

    pub fn n_array(&self) -> Array {
        Array::vector(self.n.clone())
    }

    pub fn w(&self) -> &Array {
        &self.w
    }

    pub fn u(&self) -> &Array {
        &self.u
    }

    /// Write `agent_n.npy`, `agent_w.npy` and `agent_u.npy` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        self.n_array().save(&dir.join(format!("{}.{}", AGENT_N_FILE, ARRAY_EXTENSION)))?;
        self.w.save(&dir.join(format!("{}.{}", AGENT_W_FILE, ARRAY_EXTENSION)))?;
        self.u.save(&dir.join(format!("{}.{}", AGENT_U_FILE, ARRAY_EXTENSION)))?;
        Ok(())
    }
}

/// `len` draws from Normal(0, sqrt(WEIGHT_INIT_GAIN / fan_in)).
fn he_normal<R: Rng + ?Sized>(rng: &mut R, len: usize, fan_in: usize) -> Result<Vec<f64>> {
    let scale = (WEIGHT_INIT_GAIN / fan_in as f64).sqrt();
    let normal = Normal::new(0.0, scale).map_err(|e| SimError::config(e.to_string()))?;
    Ok((0..len).map(|_| normal.sample(rng)).collect())
}
