// src/environments/engelhardt.rs
#![cfg(feature = "env-engelhardt")]

//! Confounding environment after Chaney, Stewart & Engelhardt (2018),
//! "How Algorithmic Confounding in Recommendation Systems Increases
//! Homogeneity and Decreases Utility".
//!
//! World generation (once per reset):
//! - user and item topic priors: softmax of `num_topics` uniform draws
//! - each user: a Dirichlet(user prior) preference vector and a personal
//!   known-utility weight ~ Beta with mean `known_util_weight` and variance
//!   `beta_var`
//! - each item: a Dirichlet(item prior) attribute vector
//!
//! Rating: `true_utility = 5 · ⟨preferences, attributes⟩` and the observed
//! rating is `true_utility · known_util_weight`. No randomness at rating time.
//!
//! Recommenders only ever see ids; latent vectors are exposed as zero-length
//! feature rows.

use bevy_prng::WyRand;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::environments::sdk::{DictEnvironment, Dynamics, ProtocolConfig, Rated};
use crate::error::EnvError;
use crate::variates::{self, dot};

/// Upper end of the rating scale.
pub const MAX_RATING: f64 = 5.0;

/// One synthetic user. Fixed once sampled.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    num_topics: usize,
    preferences: Vec<f64>,
    known_util_weight: f64,
}

impl User {
    /// Draw the personal weight first, then the preference vector.
    pub fn sample(
        rng: &mut WyRand,
        num_topics: usize,
        known_util_weight: f64,
        topic_concentration: &[f64],
        beta_var: f64,
    ) -> Result<Self, EnvError> {
        if topic_concentration.len() != num_topics {
            return Err(EnvError::config(format!(
                "topic concentration has {} entries, expected {num_topics}",
                topic_concentration.len()
            )));
        }
        let known_util_weight =
            variates::sample_known_util_weight(rng, known_util_weight, beta_var)?;
        let preferences = variates::sample_preference_vector(rng, topic_concentration)?;
        Ok(Self { num_topics, preferences, known_util_weight })
    }

    /// `(true_utility, observed_rating)` for an item.
    #[inline]
    pub fn rate(&self, item_attributes: &[f64]) -> (f64, f64) {
        let true_util = dot(&self.preferences, item_attributes) * MAX_RATING;
        (true_util, true_util * self.known_util_weight)
    }

    pub fn num_topics(&self) -> usize {
        self.num_topics
    }

    pub fn preferences(&self) -> &[f64] {
        &self.preferences
    }

    pub fn known_util_weight(&self) -> f64 {
        self.known_util_weight
    }
}

/// One item: a topic distribution and nothing else.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    attributes: Vec<f64>,
}

impl Item {
    pub fn sample(rng: &mut WyRand, topic_concentration: &[f64]) -> Result<Self, EnvError> {
        Ok(Self { attributes: variates::sample_preference_vector(rng, topic_concentration)? })
    }

    pub fn attributes(&self) -> &[f64] {
        &self.attributes
    }
}

fn default_rating_frequency() -> f64 {
    0.2
}

fn default_known_util_weight() -> f64 {
    0.98
}

fn default_beta_var() -> f64 {
    1e-5
}

/// Construction options. Only the three sizes are required in serialized form.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngelhardtConfig {
    pub num_topics: usize,
    pub num_users: usize,
    pub num_items: usize,
    #[serde(default = "default_rating_frequency")]
    pub rating_frequency: f64,
    #[serde(default)]
    pub num_init_ratings: usize,
    #[serde(default = "default_known_util_weight")]
    pub known_util_weight: f64,
    #[serde(default = "default_beta_var")]
    pub beta_var: f64,
}

impl EngelhardtConfig {
    pub fn new(num_topics: usize, num_users: usize, num_items: usize) -> Self {
        Self {
            num_topics,
            num_users,
            num_items,
            rating_frequency: default_rating_frequency(),
            num_init_ratings: 0,
            known_util_weight: default_known_util_weight(),
            beta_var: default_beta_var(),
        }
    }

    pub fn with_rating_frequency(mut self, p: f64) -> Self {
        self.rating_frequency = p;
        self
    }

    pub fn with_num_init_ratings(mut self, n: usize) -> Self {
        self.num_init_ratings = n;
        self
    }

    pub fn with_known_util_weight(mut self, w: f64) -> Self {
        self.known_util_weight = w;
        self
    }

    pub fn with_beta_var(mut self, v: f64) -> Self {
        self.beta_var = v;
        self
    }

    pub fn protocol(&self) -> ProtocolConfig {
        ProtocolConfig {
            rating_frequency: self.rating_frequency,
            num_init_ratings: self.num_init_ratings,
        }
    }

    /// Fail fast on anything the generative model cannot honour.
    pub fn validate(&self) -> Result<(), EnvError> {
        if self.num_topics == 0 {
            return Err(EnvError::config("num_topics must be at least 1"));
        }
        if self.num_users == 0 {
            return Err(EnvError::config("num_users must be at least 1"));
        }
        if self.num_items == 0 {
            return Err(EnvError::config("num_items must be at least 1"));
        }
        variates::BetaShape::from_moments(self.known_util_weight, self.beta_var)?;
        self.protocol().validate(self.num_users, self.num_items)
    }
}

/// Engelhardt dynamics. Users and items are stored densely by id.
#[derive(Clone, Debug)]
pub struct Engelhardt {
    cfg: EngelhardtConfig,
    user_topic_weights: Vec<f64>,
    item_topic_weights: Vec<f64>,
    users: Vec<User>,
    items: Vec<Item>,
}

impl Engelhardt {
    /// Validates the configuration; samples nothing until the first reset.
    pub fn new(cfg: EngelhardtConfig) -> Result<Self, EnvError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            user_topic_weights: Vec::new(),
            item_topic_weights: Vec::new(),
            users: Vec::new(),
            items: Vec::new(),
        })
    }

    /// Build the full environment around these dynamics.
    pub fn environment(
        cfg: EngelhardtConfig,
        seed: u64,
    ) -> Result<DictEnvironment<Self>, EnvError> {
        DictEnvironment::new(Self::new(cfg)?, cfg.protocol(), seed)
    }

    pub fn config(&self) -> &EngelhardtConfig {
        &self.cfg
    }

    pub fn user(&self, user_id: usize) -> Result<&User, EnvError> {
        self.users
            .get(user_id)
            .ok_or(EnvError::UnknownUser { user_id, num_users: self.users.len() })
    }

    pub fn item(&self, item_id: usize) -> Result<&Item, EnvError> {
        self.items
            .get(item_id)
            .ok_or(EnvError::UnknownItem { item_id, num_items: self.items.len() })
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Dirichlet concentration shared by the current users. Empty before reset.
    pub fn user_topic_weights(&self) -> &[f64] {
        &self.user_topic_weights
    }

    /// Dirichlet concentration shared by the current items. Empty before reset.
    pub fn item_topic_weights(&self) -> &[f64] {
        &self.item_topic_weights
    }
}

impl Dynamics for Engelhardt {
    fn name(&self) -> &'static str {
        "engelhardt"
    }

    fn num_users(&self) -> usize {
        self.cfg.num_users
    }

    fn num_items(&self) -> usize {
        self.cfg.num_items
    }

    fn reset_state(&mut self, rng: &mut WyRand) -> Result<(), EnvError> {
        let cfg = self.cfg;
        self.users.clear();
        self.items.clear();

        self.user_topic_weights = variates::sample_topic_weights(rng, cfg.num_topics)?;
        self.item_topic_weights = variates::sample_topic_weights(rng, cfg.num_topics)?;

        self.users = (0..cfg.num_users)
            .map(|_| {
                User::sample(
                    rng,
                    cfg.num_topics,
                    cfg.known_util_weight,
                    &self.user_topic_weights,
                    cfg.beta_var,
                )
            })
            .collect::<Result<_, _>>()?;
        self.items = (0..cfg.num_items)
            .map(|_| Item::sample(rng, &self.item_topic_weights))
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    fn rate_item(
        &mut self,
        _rng: &mut WyRand,
        user_id: usize,
        item_id: usize,
    ) -> Result<Rated, EnvError> {
        let item = self.item(item_id)?;
        let (true_utility, rating) = self.user(user_id)?.rate(item.attributes());
        trace!(user_id, item_id, true_utility, rating, "rated item");
        Ok(Rated { rating, true_utility })
    }
}
