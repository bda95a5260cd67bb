// tests/engelhardt.rs
use std::collections::BTreeMap;

use reclab::environments::engelhardt::MAX_RATING;
use reclab::variates::is_simplex;
use reclab::{Engelhardt, EngelhardtConfig, EnvError};

fn small(rating_frequency: f64) -> EngelhardtConfig {
    EngelhardtConfig::new(3, 5, 5)
        .with_known_util_weight(0.98)
        .with_beta_var(1e-5)
        .with_rating_frequency(rating_frequency)
}

/* ──────────────────────────────────────────────────────────────────────────
1) Reference scenario: 3 topics, 5 users, 5 items
────────────────────────────────────────────────────────────────────────── */

#[test]
fn small_world_populates_and_rates_recommended_users() {
    let mut env = Engelhardt::environment(small(1.0), 1234).unwrap();
    let snap = env.reset().unwrap();

    assert_eq!(snap.users.len(), 5);
    assert_eq!(snap.items.len(), 5);
    assert!(snap.users.iter().chain(&snap.items).all(|f| f.is_empty()));
    assert!(snap.ratings.is_empty());

    let dyns = env.dynamics();
    assert_eq!(dyns.users().len(), 5);
    assert_eq!(dyns.items().len(), 5);
    for u in dyns.users() {
        let w = u.known_util_weight();
        assert!(w > 0.0 && w < 1.0, "weight {w}");
        assert!((w - 0.98).abs() < 0.1, "weight {w}");
        assert_eq!(u.num_topics(), 3);
        assert!(is_simplex(u.preferences(), 1e-9));
    }
    for i in dyns.items() {
        assert!(is_simplex(i.attributes(), 1e-9));
    }

    let recs = BTreeMap::from([(0, 0), (1, 1)]);
    let (ratings, info) = env.step(&recs).unwrap();
    assert_eq!(ratings.len(), 2);
    assert_eq!((ratings[0].user_id, ratings[0].item_id), (0, 0));
    assert_eq!((ratings[1].user_id, ratings[1].item_id), (1, 1));
    for r in &ratings {
        assert!((0.0..=MAX_RATING).contains(&r.rating), "rating {}", r.rating);
    }
    assert_eq!(info.timestep, 1);
    assert_eq!(info.utilities.len(), 2);
}

#[test]
fn unknown_user_is_a_lookup_error() {
    let mut env = Engelhardt::environment(small(1.0), 7).unwrap();
    env.reset().unwrap();
    assert_eq!(
        env.rate_item(999, 0).unwrap_err(),
        EnvError::UnknownUser { user_id: 999, num_users: 5 }
    );
    assert_eq!(
        env.rate_item(0, 5).unwrap_err(),
        EnvError::UnknownItem { item_id: 5, num_items: 5 }
    );
    assert!(matches!(env.dynamics().user(999), Err(EnvError::UnknownUser { .. })));
}

/* ──────────────────────────────────────────────────────────────────────────
2) Rating model: deterministic, weighted, and invertible
────────────────────────────────────────────────────────────────────────── */

#[test]
fn user_rate_is_deterministic() {
    let mut env = Engelhardt::environment(small(1.0), 99).unwrap();
    env.reset().unwrap();
    let user = env.dynamics().user(2).unwrap();
    let item = env.dynamics().item(4).unwrap();
    assert_eq!(user.rate(item.attributes()), user.rate(item.attributes()));

    let a = env.rate_item(2, 4).unwrap();
    let b = env.rate_item(2, 4).unwrap();
    assert_eq!(a, b);
    // probing does not touch the history
    assert!(env.ratings().is_empty());
}

#[test]
fn recorded_utility_inverts_through_the_user_weight() {
    let cfg = EngelhardtConfig::new(4, 6, 8)
        .with_known_util_weight(0.6)
        .with_beta_var(0.01)
        .with_rating_frequency(1.0)
        .with_num_init_ratings(12);
    let mut env = Engelhardt::environment(cfg, 2024).unwrap();
    env.reset().unwrap();
    let recs: BTreeMap<usize, usize> = (0..6).map(|u| (u, (u * 3) % 8)).collect();
    env.step(&recs).unwrap();

    assert_eq!(env.ratings().len(), env.true_utilities().len());
    for (r, u) in env.ratings().iter().zip(env.true_utilities()) {
        assert_eq!((r.user_id, r.item_id), (u.user_id, u.item_id));
        let w = env.dynamics().user(r.user_id).unwrap().known_util_weight();
        assert!((u.true_utility - r.rating / w).abs() < 1e-9);
        assert!(r.rating <= u.true_utility);
        assert!(u.true_utility <= MAX_RATING + 1e-12);
    }
}

/* ──────────────────────────────────────────────────────────────────────────
3) World generation: reproducible per seed, regenerated per reset
────────────────────────────────────────────────────────────────────────── */

#[test]
fn same_seed_same_world() {
    let cfg = small(0.5).with_num_init_ratings(7);
    let mut a = Engelhardt::environment(cfg, 31).unwrap();
    let mut b = Engelhardt::environment(cfg, 31).unwrap();
    let sa = a.reset().unwrap();
    let sb = b.reset().unwrap();

    assert_eq!(sa, sb);
    assert_eq!(a.dynamics().users(), b.dynamics().users());
    assert_eq!(a.dynamics().items(), b.dynamics().items());
    assert_eq!(a.dynamics().user_topic_weights(), b.dynamics().user_topic_weights());
}

#[test]
fn reset_regenerates_topic_priors_and_population() {
    let mut env = Engelhardt::environment(small(1.0), 5).unwrap();
    env.reset().unwrap();
    let first_prior = env.dynamics().user_topic_weights().to_vec();
    let first_users = env.dynamics().users().to_vec();

    env.reset().unwrap();
    assert_ne!(env.dynamics().user_topic_weights(), first_prior.as_slice());
    assert_ne!(env.dynamics().users(), first_users.as_slice());
    assert!(is_simplex(env.dynamics().item_topic_weights(), 1e-9));
}

#[test]
fn construction_samples_nothing() {
    let env = Engelhardt::environment(small(1.0), 5).unwrap();
    assert!(env.dynamics().users().is_empty());
    assert!(env.dynamics().user_topic_weights().is_empty());
    assert_eq!(env.name(), "engelhardt");
}

/* ──────────────────────────────────────────────────────────────────────────
4) Configuration is validated up front
────────────────────────────────────────────────────────────────────────── */

#[test]
fn invalid_configurations_fail_fast() {
    let bad = [
        EngelhardtConfig::new(0, 5, 5),
        EngelhardtConfig::new(3, 0, 5),
        EngelhardtConfig::new(3, 5, 0),
        EngelhardtConfig::new(3, 5, 5).with_beta_var(0.5),
        EngelhardtConfig::new(3, 5, 5).with_beta_var(0.0),
        EngelhardtConfig::new(3, 5, 5).with_known_util_weight(1.2),
        EngelhardtConfig::new(3, 5, 5).with_rating_frequency(1.5),
        EngelhardtConfig::new(3, 5, 5).with_rating_frequency(f64::NAN),
        EngelhardtConfig::new(3, 5, 5).with_num_init_ratings(26),
    ];
    for cfg in bad {
        let err = Engelhardt::environment(cfg, 0).err();
        assert!(matches!(err, Some(EnvError::InvalidConfig(_))), "{cfg:?} -> {err:?}");
    }
    let full_grid = EngelhardtConfig::new(3, 5, 5).with_num_init_ratings(25);
    assert!(Engelhardt::environment(full_grid, 0).is_ok());
}

#[test]
fn partial_json_config_fills_defaults() {
    let cfg: EngelhardtConfig =
        serde_json::from_str(r#"{ "num_topics": 3, "num_users": 5, "num_items": 5 }"#).unwrap();
    assert_eq!(cfg, EngelhardtConfig::new(3, 5, 5));
    assert_eq!(cfg.rating_frequency, 0.2);
    assert_eq!(cfg.num_init_ratings, 0);
    assert_eq!(cfg.known_util_weight, 0.98);
    assert_eq!(cfg.beta_var, 1e-5);

    let cfg: EngelhardtConfig = serde_json::from_str(
        r#"{ "num_topics": 2, "num_users": 4, "num_items": 4, "num_init_ratings": 3, "beta_var": 0.001 }"#,
    )
    .unwrap();
    assert_eq!(cfg.num_init_ratings, 3);
    assert_eq!(cfg.beta_var, 0.001);
    assert!(cfg.validate().is_ok());
}
