/*!
`reclab` — seeded recommender-system environments for studying algorithmic
confounding.

What it does
- Generates a synthetic world of users and items with latent topic vectors.
- Turns recommendations into ratings through a two-sided model: a hidden
  true utility and the observed rating derived from it.
- Exposes the stepwise protocol recommenders are evaluated against:
  `reset → (recommend → step)*`.

How to use (call surface only)
- Build an environment, e.g. `Engelhardt::environment(cfg, seed)?`.
- `reset()?` returns the feature views and any initial ratings.
- `step(&recommendations)?` with a `BTreeMap<user_id, item_id>` returns the
  ratings made during that step plus offline-only true utilities.
- Or hand a [`Recommender`] to [`run_trial`] and let it drive the loop.

What it does NOT do
- No recommender models, no hyperparameter tuning, no result storage.
  Those consume the arrays this crate produces.
*/

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod environments;
pub mod error;
pub mod variates;

pub use environments::{DictEnvironment, Dynamics, ProtocolConfig, Rated, Snapshot, StepInfo};
#[cfg(feature = "env-engelhardt")]
pub use environments::{Engelhardt, EngelhardtConfig, Item, User};
pub use error::EnvError;

/// One observed rating.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: usize,
    pub item_id: usize,
    pub rating: f64,
}

/// The hidden utility behind the rating with the same `(user_id, item_id)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UtilityRecord {
    pub user_id: usize,
    pub item_id: usize,
    pub true_utility: f64,
}

/// The seam an algorithm under evaluation plugs into.
/// It only ever sees ids, side features and observed ratings.
pub trait Recommender {
    /// Start of a trial: feature views and the initial ratings.
    fn reset(&mut self, users: &[Vec<f64>], items: &[Vec<f64>], ratings: &[RatingRecord]);

    /// Pick at most one item per user for the coming step.
    fn recommend(&mut self, timestep: u64) -> BTreeMap<usize, usize>;

    /// Ratings produced by the last step.
    fn observe(&mut self, ratings: &[RatingRecord]);
}

/// Everything a trial produced, utilities included, for offline scoring.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrialLog {
    pub initial_ratings: Vec<RatingRecord>,
    pub initial_utilities: Vec<UtilityRecord>,
    /// One entry per step: (ratings, utilities) in matching order.
    pub steps: Vec<(Vec<RatingRecord>, Vec<UtilityRecord>)>,
}

impl TrialLog {
    /// Mean true utility of all ratings made after the initial ones.
    pub fn mean_step_utility(&self) -> Option<f64> {
        let (sum, n) = self
            .steps
            .iter()
            .flat_map(|(_, u)| u)
            .fold((0.0, 0usize), |(s, n), u| (s + u.true_utility, n + 1));
        (n > 0).then(|| sum / n as f64)
    }
}

/// Closed loop: reset once, then `len_trial` rounds of
/// `recommend → step → observe`.
pub fn run_trial<D, R>(
    env: &mut DictEnvironment<D>,
    recommender: &mut R,
    len_trial: usize,
) -> Result<TrialLog, EnvError>
where
    D: Dynamics,
    R: Recommender + ?Sized,
{
    let snap = env.reset()?;
    recommender.reset(&snap.users, &snap.items, &snap.ratings);

    let mut log = TrialLog {
        initial_ratings: snap.ratings,
        initial_utilities: snap.utilities,
        steps: Vec::with_capacity(len_trial),
    };
    for _ in 0..len_trial {
        let t = env.timestep().ok_or(EnvError::NotReset)?;
        let recs = recommender.recommend(t);
        let (ratings, info) = env.step(&recs)?;
        recommender.observe(&ratings);
        log.steps.push((ratings, info.utilities));
    }
    Ok(log)
}
