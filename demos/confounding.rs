// demos/confounding.rs
// Run with:
//   RUST_LOG=debug cargo run --example confounding

use std::collections::BTreeMap;

use reclab::{Engelhardt, EngelhardtConfig, RatingRecord, Recommender, run_trial};

/// Recommends each user the item with the best observed average so far;
/// unseen items win ties so everything gets tried once.
struct Popularity {
    num_users: usize,
    sums: Vec<(f64, usize)>,
}

impl Recommender for Popularity {
    fn reset(&mut self, users: &[Vec<f64>], items: &[Vec<f64>], ratings: &[RatingRecord]) {
        self.num_users = users.len();
        self.sums = vec![(0.0, 0); items.len()];
        self.observe(ratings);
    }

    fn recommend(&mut self, _timestep: u64) -> BTreeMap<usize, usize> {
        let score = |(s, n): (f64, usize)| if n == 0 { f64::INFINITY } else { s / n as f64 };
        let best = (0..self.sums.len())
            .max_by(|a, b| score(self.sums[*a]).total_cmp(&score(self.sums[*b])))
            .unwrap_or(0);
        (0..self.num_users).map(|u| (u, best)).collect()
    }

    fn observe(&mut self, ratings: &[RatingRecord]) {
        for r in ratings {
            let slot = &mut self.sums[r.item_id];
            slot.0 += r.rating;
            slot.1 += 1;
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = EngelhardtConfig::new(10, 100, 170).with_num_init_ratings(1_000);

    for seed in 0..3u64 {
        let mut env = match Engelhardt::environment(cfg, seed) {
            Ok(env) => env,
            Err(e) => {
                tracing::error!("bad configuration: {e}");
                return;
            }
        };
        let mut rec = Popularity { num_users: 0, sums: Vec::new() };
        match run_trial(&mut env, &mut rec, 50) {
            Ok(log) => {
                let n: usize = log.steps.iter().map(|(r, _)| r.len()).sum();
                println!(
                    "seed {seed}: {n} ratings over {} steps, mean true utility {:.3}",
                    log.steps.len(),
                    log.mean_step_utility().unwrap_or(0.0),
                );
            }
            Err(e) => tracing::error!("trial failed: {e}"),
        }
    }
}
