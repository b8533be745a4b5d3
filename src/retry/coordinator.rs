use rand::{SeedableRng, rngs::StdRng};
use reqwest::StatusCode;
use std::fmt;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

use crate::errors::Error;

use super::{RetryOutcome, plan::RetryPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    AcquireToken,
    StreamIngest,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::AcquireToken => write!(f, "acquire_token"),
            OperationKind::StreamIngest => write!(f, "stream_ingest"),
        }
    }
}

pub struct RetryCoordinator {
    plan: RetryPlan,
    rng: Mutex<StdRng>,
}

impl RetryCoordinator {
    pub fn new(plan: RetryPlan) -> Self {
        Self {
            plan,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Runs `op` until it succeeds, fails with a permanent error, or the
    /// plan's attempt budget is spent. `op` receives the 1-based attempt.
    pub async fn execute<F, Fut, T>(
        &self,
        operation: OperationKind,
        mut op: F,
    ) -> Result<(T, RetryOutcome), Error>
    where
        F: FnMut(u8) -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, Error>> + Send,
    {
        let mut attempt: u8 = 1;
        let mut previous = self.plan.initial_delay;
        let start = Instant::now();
        loop {
            match op(attempt).await {
                Ok(value) => {
                    let outcome = RetryOutcome {
                        operation,
                        attempts: attempt,
                        success: true,
                        elapsed: start.elapsed(),
                    };
                    outcome.log();
                    return Ok((value, outcome));
                }
                Err(err) => {
                    if attempt >= self.plan.max_attempts || !Self::is_retriable(operation, &err) {
                        let outcome = RetryOutcome {
                            operation,
                            attempts: attempt,
                            success: false,
                            elapsed: start.elapsed(),
                        };
                        outcome.log();
                        return Err(err);
                    }
                    let delay = {
                        let mut rng = self.rng.lock().await;
                        self.plan.delay_for_attempt(attempt + 1, previous, &mut *rng)
                    };
                    previous = delay;
                    warn!(
                        operation = %operation,
                        attempt,
                        max_attempts = self.plan.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retry.scheduling"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Token requests are idempotent and retry on transport failures,
    /// timeouts, 408, 429 and 5xx. A rejected credential (400/401/403) is
    /// final. Streaming ingest is not idempotent: only failures where the
    /// service did not take the body are retried (connect errors, 401 after
    /// a token refresh, non-permanent 429).
    pub fn is_retriable(operation: OperationKind, err: &Error) -> bool {
        match operation {
            OperationKind::AcquireToken => match err {
                Error::Reqwest(_) | Error::Timeout(_) => true,
                Error::Http(status, _) => {
                    *status == StatusCode::REQUEST_TIMEOUT
                        || *status == StatusCode::TOO_MANY_REQUESTS
                        || status.is_server_error()
                }
                _ => false,
            },
            OperationKind::StreamIngest => match err {
                Error::Reqwest(err) => err.is_connect(),
                Error::Http(status, _) => not_accepted(*status),
                Error::Service(service) => !service.permanent && not_accepted(service.status),
                _ => false,
            },
        }
    }
}

/// Statuses returned before the service accepts an ingest body.
fn not_accepted(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::TOO_MANY_REQUESTS
}

impl Default for RetryCoordinator {
    fn default() -> Self {
        Self::new(RetryPlan::default_plan())
    }
}
