// src/environments/mod.rs

// The generic state machine is always available; concrete environments are
// feature-gated so downstream crates build only what they simulate.

pub mod sdk;
pub use sdk::*;

#[cfg(feature = "env-engelhardt")]
pub mod engelhardt;

#[cfg(feature = "env-engelhardt")]
pub use engelhardt::*;
