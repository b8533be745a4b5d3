use std::time::Duration;

use kusto_ingest::errors::Error;
use kusto_ingest::token::RefreshPolicy;

#[test]
fn derive_threshold_uses_20_percent_cap() {
    let ttl = Duration::from_secs(1_000);
    assert_eq!(RefreshPolicy::derive_threshold(ttl), Duration::from_secs(120));

    // An hour-long AAD token still refreshes two minutes ahead.
    let ttl = Duration::from_secs(3_599);
    assert_eq!(RefreshPolicy::derive_threshold(ttl), Duration::from_secs(120));

    let ttl = Duration::from_secs(300);
    assert_eq!(RefreshPolicy::derive_threshold(ttl), Duration::from_secs(60));
}

#[test]
fn policy_rejects_high_skew() {
    let err = RefreshPolicy::new(
        Duration::from_secs(60),
        Duration::from_secs(10),
        Duration::from_secs(60),
    )
    .expect_err("max skew must be < threshold");
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn policy_rejects_zero_threshold() {
    let err = RefreshPolicy::new(Duration::ZERO, Duration::ZERO, Duration::ZERO)
        .expect_err("zero threshold");
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn default_policy_is_valid() {
    let default = RefreshPolicy::default();
    let rebuilt = RefreshPolicy::new(default.threshold, default.min_cooldown, default.max_skew)
        .expect("default policy passes validation");
    assert_eq!(rebuilt.threshold, Duration::from_secs(120));
}
