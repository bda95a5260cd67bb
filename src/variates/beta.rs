/// Beta-distributed known-utility weights, parameterised by mean and variance.
use bevy_prng::WyRand;
use rand_distr::{Beta, Distribution};

use crate::error::EnvError;

/// Smallest admissible shape parameter. Below it nearly all Beta mass sits
/// within f64 rounding of 0 or 1, so draws land on the endpoints.
pub const MIN_SHAPE: f64 = 1e-2;

/// Endpoint redraws tolerated per weight before the shape is rejected.
const MAX_REDRAWS: usize = 1_000;

/// Beta shape parameters recovered from a target mean and variance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BetaShape {
    pub alpha: f64,
    pub beta: f64,
}

impl BetaShape {
    /// Method of moments:
    /// α = ((1 − m)/v − 1/m)·m², β = α·(1/m − 1).
    ///
    /// Requires `0 < m < 1` and `0 < v < m(1 − m)`; anything else has no
    /// Beta distribution with those moments. Both shapes must also reach
    /// [`MIN_SHAPE`], which rules out variances crowding `m(1 − m)`.
    pub fn from_moments(mean: f64, var: f64) -> Result<Self, EnvError> {
        if !(mean > 0.0 && mean < 1.0) {
            return Err(EnvError::config(format!(
                "known_util_weight must lie in (0, 1), got {mean}"
            )));
        }
        let max_var = mean * (1.0 - mean);
        if !(var > 0.0 && var < max_var) {
            return Err(EnvError::config(format!(
                "beta_var must lie in (0, {max_var}) for known_util_weight {mean}, got {var}"
            )));
        }
        let alpha = ((1.0 - mean) / var - 1.0 / mean) * mean * mean;
        let beta = alpha * (1.0 / mean - 1.0);
        if alpha.min(beta) < MIN_SHAPE {
            return Err(EnvError::config(format!(
                "beta_var {var} is too close to {max_var} for known_util_weight {mean}: \
                 Beta({alpha}, {beta}) has a shape below {MIN_SHAPE}"
            )));
        }
        Ok(Self { alpha, beta })
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    #[inline]
    pub fn variance(&self) -> f64 {
        let s = self.alpha + self.beta;
        self.alpha * self.beta / (s * s * (s + 1.0))
    }
}

/// One per-user weight in the open interval (0, 1).
pub fn sample_known_util_weight(
    rng: &mut WyRand,
    target_mean: f64,
    target_var: f64,
) -> Result<f64, EnvError> {
    let shape = BetaShape::from_moments(target_mean, target_var)?;
    let dist = Beta::new(shape.alpha, shape.beta).map_err(|e| {
        EnvError::config(format!("Beta({}, {}) rejected: {e}", shape.alpha, shape.beta))
    })?;
    // Small shapes can still round onto an endpoint in f64.
    for _ in 0..MAX_REDRAWS {
        let w = dist.sample(rng);
        if w > 0.0 && w < 1.0 {
            return Ok(w);
        }
    }
    Err(EnvError::config(format!(
        "Beta({}, {}) kept sampling 0 or 1 after {MAX_REDRAWS} draws",
        shape.alpha, shape.beta
    )))
}
