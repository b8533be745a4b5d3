use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use kusto_ingest::token::{RefreshPolicy, TokenGuard, TokenGuardConfig, TokenSnapshot};

fn guard() -> TokenGuard {
    TokenGuard::empty(TokenGuardConfig {
        policy: RefreshPolicy::new(
            Duration::from_secs(120),
            Duration::ZERO,
            Duration::from_secs(30),
        )
        .expect("policy"),
        clock_skew: Duration::from_secs(0),
    })
}

fn snapshot(value: &str, ttl_secs: u64) -> TokenSnapshot {
    let issued = SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    TokenSnapshot {
        value: value.to_string(),
        issued_at: issued,
        expires_at: issued + ttl_secs,
    }
}

/// Seeds `guard` with a token living `ttl_secs`.
async fn seed(guard: &TokenGuard, value: &str, ttl_secs: u64) {
    let value = value.to_string();
    guard
        .ensure_fresh(false, move || async move { Ok(snapshot(&value, ttl_secs)) })
        .await
        .expect("seed token");
}

#[tokio::test(flavor = "current_thread")]
async fn fresh_token_is_reused() {
    let guard = guard();
    seed(&guard, "initial", 3600).await;

    let refresh_called = Arc::new(AtomicUsize::new(0));
    let called = refresh_called.clone();
    let token = guard
        .ensure_fresh(false, move || async move {
            called.fetch_add(1, Ordering::SeqCst);
            Ok(snapshot("refreshed", 3600))
        })
        .await
        .expect("should succeed");

    assert_eq!(token.value, "initial");
    assert_eq!(refresh_called.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn token_near_expiry_is_refreshed() {
    let guard = guard();
    // Issued ten minutes ago with thirty seconds left.
    let mut old = snapshot("stale", 630);
    old.issued_at -= 600;
    old.expires_at -= 600;
    guard
        .ensure_fresh(false, move || async move { Ok(old) })
        .await
        .expect("seed token");

    let token = guard
        .ensure_fresh(false, || async { Ok(snapshot("refreshed", 3600)) })
        .await
        .expect("refresh succeeds");
    assert_eq!(token.value, "refreshed");
}

#[tokio::test(flavor = "current_thread")]
async fn rejected_token_is_replaced() {
    let guard = guard();
    seed(&guard, "revoked", 3600).await;
    let token = guard
        .ensure_fresh(true, || async { Ok(snapshot("replacement", 3600)) })
        .await
        .expect("refresh after rejection succeeds");
    assert_eq!(token.value, "replacement");

    let token = guard
        .ensure_fresh(false, || async { Ok(snapshot("unused", 3600)) })
        .await
        .expect("cached");
    assert_eq!(token.value, "replacement");
}

#[tokio::test(flavor = "current_thread")]
async fn empty_guard_fetches_on_first_use() {
    let guard = TokenGuard::empty(TokenGuardConfig::default());
    let token = guard
        .ensure_fresh(false, || async { Ok(snapshot("first", 3600)) })
        .await
        .expect("initial fetch");
    assert_eq!(token.value, "first");
}

#[tokio::test(flavor = "current_thread")]
async fn short_lived_token_is_rejected() {
    let guard = guard();
    let err = guard
        .ensure_fresh(false, || async { Ok(snapshot("brief", 30)) })
        .await
        .expect_err("ttl under a minute");
    assert!(matches!(err, kusto_ingest::Error::Config(_)));
}

#[tokio::test(flavor = "current_thread")]
async fn refresh_failure_is_surfaced() {
    let guard = guard();
    let err = guard
        .ensure_fresh(false, || async {
            Err(kusto_ingest::Error::Config(
                "simulated refresh failure".into(),
            ))
        })
        .await
        .expect_err("should error");

    match err {
        kusto_ingest::Error::Config(msg) => assert!(msg.contains("simulated")),
        other => panic!("unexpected error: {:?}", other),
    }
}
