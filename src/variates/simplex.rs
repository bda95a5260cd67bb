//! Probability vectors over topics: softmax priors and Dirichlet draws.

use bevy_prng::WyRand;
use rand_distr::{Distribution, Gamma};

use crate::error::EnvError;
use crate::variates::stoch;

/// Numerically stable softmax. Empty input gives an empty vector.
pub fn softmax(xs: &[f64]) -> Vec<f64> {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = xs.iter().map(|x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Inner product of two equally sized vectors.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Non-negative entries summing to one within `tol`.
pub fn is_simplex(v: &[f64], tol: f64) -> bool {
    !v.is_empty()
        && v.iter().all(|x| x.is_finite() && *x >= 0.0)
        && (v.iter().sum::<f64>() - 1.0).abs() <= tol
}

/// `num_topics` uniform(0,1) draws pushed through softmax.
///
/// The result is used as the Dirichlet concentration shared by every user
/// (or every item) of one generated world.
pub fn sample_topic_weights(rng: &mut WyRand, num_topics: usize) -> Result<Vec<f64>, EnvError> {
    if num_topics == 0 {
        return Err(EnvError::config("num_topics must be at least 1"));
    }
    let raw: Vec<f64> = (0..num_topics).map(|_| stoch::unit01(rng)).collect();
    Ok(softmax(&raw))
}

/// One Dirichlet(concentration) draw, built from independent Gamma(α_k, 1)
/// variates normalised by their sum.
pub fn sample_preference_vector(
    rng: &mut WyRand,
    concentration: &[f64],
) -> Result<Vec<f64>, EnvError> {
    if concentration.is_empty() {
        return Err(EnvError::config("Dirichlet concentration must be non-empty"));
    }
    let gammas = concentration
        .iter()
        .map(|&alpha| {
            Gamma::new(alpha, 1.0).map_err(|e| {
                EnvError::config(format!("Dirichlet concentration {alpha} rejected: {e}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Very small concentrations can underflow every component to zero; redraw.
    loop {
        let draws: Vec<f64> = gammas.iter().map(|g| g.sample(rng)).collect();
        let sum: f64 = draws.iter().sum();
        if sum > 0.0 && sum.is_finite() {
            return Ok(draws.into_iter().map(|d| d / sum).collect());
        }
    }
}
