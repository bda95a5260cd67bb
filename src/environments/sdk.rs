// src/environments/sdk.rs

//! # Environment SDK
//!
//! The generic rating-environment state machine (`DictEnvironment`) plus the
//! small hook protocol (`Dynamics`) a concrete environment implements.
//!
//! ## Protocol
//! ```text
//!   new ──► UNINITIALIZED ──reset()──► READY ──step()──► READY ──► …
//!                                        ▲                 │
//!                                        └────reset()──────┘
//! ```
//! - `reset()` asks the dynamics to regenerate its world, clears the rating
//!   and utility histories, zeroes the timestep and then (optionally) seeds
//!   the history with `num_init_ratings` random ratings.
//! - `step(recs)` lets each recommended user rate their item with probability
//!   `rating_frequency`, appends to the histories and advances the timestep.
//!   It returns only the ratings made during that step.
//! - There is no terminal state; the caller decides when to stop.
//!
//! ## Writing a new environment
//! Implement [`Dynamics`]:
//! 1) **reset_state**: rebuild users/items from the borrowed generator. Must
//!    not keep anything from the previous world.
//! 2) **rate_item**: produce the observed rating and the true utility behind
//!    it. Unknown ids are errors, never defaults.
//!
//! Everything else (histories, timestep, participation draws, initial ratings)
//! lives here so that every environment shares the same bookkeeping.
//!
//! ## Determinism
//! One `WyRand` per environment, seeded at construction or through
//! [`DictEnvironment::seed`]. The same seed followed by the same call sequence
//! yields the same world and the same rating stream.

use std::collections::BTreeMap;

use bevy_prng::WyRand;
use rand::seq::index;
use rand_core::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EnvError;
use crate::variates::stoch;
use crate::{RatingRecord, UtilityRecord};

/// Outcome of one rating: what the recommender sees and what it never sees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rated {
    pub rating: f64,
    pub true_utility: f64,
}

/// Hooks a concrete environment supplies to [`DictEnvironment`].
pub trait Dynamics {
    /// Short identifier used in logs and result tables.
    fn name(&self) -> &'static str;

    /// Configured population sizes. Known before the first reset.
    fn num_users(&self) -> usize;
    fn num_items(&self) -> usize;

    /// Regenerate users and items from scratch.
    fn reset_state(&mut self, rng: &mut WyRand) -> Result<(), EnvError>;

    /// Rate one item. The generator is offered to stochastic environments;
    /// deterministic ones may ignore it.
    fn rate_item(&mut self, rng: &mut WyRand, user_id: usize, item_id: usize)
        -> Result<Rated, EnvError>;

    /// Side features visible to recommenders (default: none).
    fn user_features(&self, _user_id: usize) -> Vec<f64> {
        Vec::new()
    }

    /// Side features visible to recommenders (default: none).
    fn item_features(&self, _item_id: usize) -> Vec<f64> {
        Vec::new()
    }
}

/// The part of the configuration the state machine itself consumes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Probability that a recommended user rates during a step.
    pub rating_frequency: f64,
    /// Ratings generated by `reset` before the first step.
    pub num_init_ratings: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self { rating_frequency: 0.2, num_init_ratings: 0 }
    }
}

impl ProtocolConfig {
    pub fn validate(&self, num_users: usize, num_items: usize) -> Result<(), EnvError> {
        if !(0.0..=1.0).contains(&self.rating_frequency) {
            return Err(EnvError::config(format!(
                "rating_frequency must lie in [0, 1], got {}",
                self.rating_frequency
            )));
        }
        let grid = num_users.checked_mul(num_items).ok_or_else(|| {
            EnvError::config(format!("{num_users} users × {num_items} items overflows"))
        })?;
        if self.num_init_ratings > grid {
            return Err(EnvError::config(format!(
                "num_init_ratings {} exceeds the {grid} distinct (user, item) pairs",
                self.num_init_ratings
            )));
        }
        Ok(())
    }
}

/// What `reset` hands back: the feature views plus the initial histories.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub users: Vec<Vec<f64>>,
    pub items: Vec<Vec<f64>>,
    pub ratings: Vec<RatingRecord>,
    pub utilities: Vec<UtilityRecord>,
}

/// Auxiliary step output. Offline evaluation only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepInfo {
    /// Timestep after the step was applied.
    pub timestep: u64,
    /// True utilities behind this step's ratings, in the same order.
    pub utilities: Vec<UtilityRecord>,
}

/// Generic environment: histories, timestep and the reset/step protocol.
pub struct DictEnvironment<D: Dynamics> {
    dynamics: D,
    protocol: ProtocolConfig,
    rng: WyRand,
    seed: u64,
    timestep: Option<u64>,
    ratings: Vec<RatingRecord>,
    utilities: Vec<UtilityRecord>,
}

impl<D: Dynamics> DictEnvironment<D> {
    pub fn new(dynamics: D, protocol: ProtocolConfig, seed: u64) -> Result<Self, EnvError> {
        protocol.validate(dynamics.num_users(), dynamics.num_items())?;
        Ok(Self {
            dynamics,
            protocol,
            rng: WyRand::from_seed(seed.to_le_bytes()),
            seed,
            timestep: None,
            ratings: Vec::new(),
            utilities: Vec::new(),
        })
    }

    /// Replace the generator. The current world is left untouched; call
    /// `reset` to regenerate it from the new seed.
    pub fn seed(&mut self, seed: u64) {
        self.rng = WyRand::from_seed(seed.to_le_bytes());
        self.seed = seed;
    }

    pub fn name(&self) -> &'static str {
        self.dynamics.name()
    }

    pub fn dynamics(&self) -> &D {
        &self.dynamics
    }

    pub fn protocol(&self) -> ProtocolConfig {
        self.protocol
    }

    /// `None` until the first successful reset.
    pub fn timestep(&self) -> Option<u64> {
        self.timestep
    }

    pub fn ratings(&self) -> &[RatingRecord] {
        &self.ratings
    }

    /// Parallel to [`ratings`](Self::ratings). Never show these to a recommender.
    pub fn true_utilities(&self) -> &[UtilityRecord] {
        &self.utilities
    }

    pub fn users(&self) -> Vec<Vec<f64>> {
        (0..self.dynamics.num_users()).map(|u| self.dynamics.user_features(u)).collect()
    }

    pub fn items(&self) -> Vec<Vec<f64>> {
        (0..self.dynamics.num_items()).map(|i| self.dynamics.item_features(i)).collect()
    }

    /// `num_users × num_items` matrix of the latest rating per pair; 0 where unrated.
    pub fn dense_ratings(&self) -> Vec<Vec<f64>> {
        let mut dense = vec![vec![0.0; self.dynamics.num_items()]; self.dynamics.num_users()];
        for r in &self.ratings {
            dense[r.user_id][r.item_id] = r.rating;
        }
        dense
    }

    /// Regenerate the world and the initial histories.
    pub fn reset(&mut self) -> Result<Snapshot, EnvError> {
        self.timestep = None;
        self.ratings.clear();
        self.utilities.clear();

        self.dynamics.reset_state(&mut self.rng)?;
        self.timestep = Some(0);

        let (n_users, n_items) = (self.dynamics.num_users(), self.dynamics.num_items());
        let k = self.protocol.num_init_ratings;
        if k > 0 {
            // Distinct pairs, uniform over the grid, rated in flat-index order.
            let mut flat = index::sample(&mut self.rng, n_users * n_items, k).into_vec();
            flat.sort_unstable();
            for idx in flat {
                self.record(idx / n_items, idx % n_items)?;
            }
        }

        debug!(
            env = self.dynamics.name(),
            seed = self.seed,
            users = n_users,
            items = n_items,
            init_ratings = self.ratings.len(),
            "environment reset"
        );

        Ok(Snapshot {
            users: self.users(),
            items: self.items(),
            ratings: self.ratings.clone(),
            utilities: self.utilities.clone(),
        })
    }

    /// Apply one round of recommendations (`user_id → item_id`).
    ///
    /// Every id is checked before anything is drawn or recorded, so a bad
    /// mapping leaves the environment exactly as it was.
    pub fn step(
        &mut self,
        recommendations: &BTreeMap<usize, usize>,
    ) -> Result<(Vec<RatingRecord>, StepInfo), EnvError> {
        let t = self.timestep.ok_or(EnvError::NotReset)?;
        for (&user_id, &item_id) in recommendations {
            self.check_ids(user_id, item_id)?;
        }

        let start = self.ratings.len();
        for (&user_id, &item_id) in recommendations {
            if stoch::bernoulli_lazy(&mut self.rng, self.protocol.rating_frequency) {
                self.record(user_id, item_id)?;
            }
        }

        let timestep = t + 1;
        self.timestep = Some(timestep);
        debug!(
            env = self.dynamics.name(),
            timestep,
            recommended = recommendations.len(),
            rated = self.ratings.len() - start,
            "environment step"
        );

        Ok((
            self.ratings[start..].to_vec(),
            StepInfo { timestep, utilities: self.utilities[start..].to_vec() },
        ))
    }

    /// Ask the dynamics for one rating without recording it.
    pub fn rate_item(&mut self, user_id: usize, item_id: usize) -> Result<Rated, EnvError> {
        if self.timestep.is_none() {
            return Err(EnvError::NotReset);
        }
        self.check_ids(user_id, item_id)?;
        self.dynamics.rate_item(&mut self.rng, user_id, item_id)
    }

    fn record(&mut self, user_id: usize, item_id: usize) -> Result<(), EnvError> {
        let rated = self.dynamics.rate_item(&mut self.rng, user_id, item_id)?;
        self.ratings.push(RatingRecord { user_id, item_id, rating: rated.rating });
        self.utilities.push(UtilityRecord { user_id, item_id, true_utility: rated.true_utility });
        Ok(())
    }

    fn check_ids(&self, user_id: usize, item_id: usize) -> Result<(), EnvError> {
        let (num_users, num_items) = (self.dynamics.num_users(), self.dynamics.num_items());
        if user_id >= num_users {
            return Err(EnvError::UnknownUser { user_id, num_users });
        }
        if item_id >= num_items {
            return Err(EnvError::UnknownItem { item_id, num_items });
        }
        Ok(())
    }
}
