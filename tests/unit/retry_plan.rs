use std::time::Duration;

use rand::SeedableRng;

use kusto_ingest::retry::{JitterStrategy, RetryPlan};

fn plan(jitter: JitterStrategy) -> RetryPlan {
    RetryPlan::new(
        6,
        Duration::from_millis(100),
        2.0,
        Duration::from_secs(10),
        jitter,
    )
}

#[test]
fn delay_respects_cap() {
    let plan = RetryPlan::new(
        5,
        Duration::from_millis(10),
        2.0,
        Duration::from_millis(40),
        JitterStrategy::Decorrelated,
    );
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let mut previous = plan.initial_delay;
    for attempt in 2..=5u8 {
        let delay = plan.delay_for_attempt(attempt, previous, &mut rng);
        assert!(delay <= Duration::from_millis(40));
        assert!(delay >= Duration::from_millis(10));
        previous = delay;
    }
}

#[test]
fn full_jitter_stays_under_the_ceiling() {
    let plan = plan(JitterStrategy::Full);
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let mut below_half = false;
    for attempt in 2..=6u8 {
        let ceiling = plan.backoff_ceiling(attempt);
        for _ in 0..20 {
            let delay = plan.delay_for_attempt(attempt, Duration::ZERO, &mut rng);
            assert!(delay <= ceiling, "attempt {attempt}: {delay:?} > {ceiling:?}");
            below_half |= delay < ceiling / 2;
        }
    }
    assert!(below_half, "full jitter should reach below half the ceiling");
}

#[test]
fn equal_jitter_keeps_at_least_half() {
    let plan = plan(JitterStrategy::Equal);
    let mut rng = rand::rngs::StdRng::seed_from_u64(9);
    for attempt in 2..=6u8 {
        let ceiling = plan.backoff_ceiling(attempt);
        let delay = plan.delay_for_attempt(attempt, Duration::ZERO, &mut rng);
        assert!(delay >= ceiling / 2 && delay <= ceiling, "attempt {attempt}: {delay:?}");
    }
}

#[test]
fn default_plan_uses_equal_jitter() {
    let plan = RetryPlan::default_plan();
    assert!(plan.max_attempts > 1);
    assert!(plan.initial_delay < plan.max_delay);
    assert_eq!(plan.jitter, JitterStrategy::Equal);
}
