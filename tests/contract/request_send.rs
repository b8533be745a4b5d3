use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use kusto_ingest::errors::Error;
use kusto_ingest::retry::{JitterStrategy, OperationKind, RetryCoordinator, RetryPlan};

fn coordinator(attempts: u8) -> RetryCoordinator {
    RetryCoordinator::new(RetryPlan::new(
        attempts,
        Duration::from_millis(5),
        1.2,
        Duration::from_millis(20),
        JitterStrategy::Full,
    ))
}

#[tokio::test(flavor = "current_thread")]
async fn request_send_contract_surfaces_429_after_retries() {
    let calls = Arc::new(AtomicU8::new(0));
    let err = coordinator(2)
        .execute(OperationKind::StreamIngest, |_attempt| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::Http(
                    reqwest::StatusCode::TOO_MANY_REQUESTS,
                    "throttled".into(),
                ))
            }
        })
        .await
        .expect_err("request should surface throttling");

    match err {
        Error::Http(status, body) => {
            assert_eq!(status, reqwest::StatusCode::TOO_MANY_REQUESTS);
            assert!(body.contains("throttled"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn request_send_contract_stops_on_client_error() {
    let calls = Arc::new(AtomicU8::new(0));
    let err = coordinator(4)
        .execute(OperationKind::StreamIngest, |_attempt| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::Http(reqwest::StatusCode::BAD_REQUEST, "bad".into()))
            }
        })
        .await
        .expect_err("400 is final");
    assert_eq!(err.status(), Some(reqwest::StatusCode::BAD_REQUEST));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn request_send_contract_reports_attempts_on_success() {
    let (value, outcome) = coordinator(3)
        .execute(OperationKind::AcquireToken, |attempt| async move {
            if attempt < 2 {
                Err(Error::Http(reqwest::StatusCode::SERVICE_UNAVAILABLE, "busy".into()))
            } else {
                Ok(attempt)
            }
        })
        .await
        .expect("second attempt succeeds");
    assert_eq!(value, 2);
    assert_eq!(outcome.attempts, 2);
    assert!(outcome.success);
    assert_eq!(outcome.operation, OperationKind::AcquireToken);
}
