/// Scalar random helpers on top of `bevy_prng::WyRand`.
/// The generator is always borrowed from its owner; nothing here keeps state.
use bevy_prng::WyRand;
use rand_core::RngCore;

/// Uniform draw in `[0, 1)` from the top 53 bits of one `u64`.
#[inline]
pub fn unit01(rng: &mut WyRand) -> f64 {
    ((rng.next_u64() >> 11) as f64) / ((1u64 << 53) as f64)
}

/// Bernoulli(p) with WyRand. `p` outside `[0, 1]` is clamped.
#[inline]
pub fn bernoulli(rng: &mut WyRand, p: f64) -> bool {
    unit01(rng) < p.clamp(0.0, 1.0)
}

/// Bernoulli(p) that consumes no randomness when the outcome is certain.
///
/// Used for participation draws so that `p == 1` keeps the generator stream
/// identical to a run that never asks.
#[inline]
pub fn bernoulli_lazy(rng: &mut WyRand, p: f64) -> bool {
    if p >= 1.0 {
        true
    } else if p <= 0.0 {
        false
    } else {
        bernoulli(rng, p)
    }
}
