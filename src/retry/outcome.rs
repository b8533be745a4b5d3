use std::time::Duration;

use tracing::Level;
use tracing::event;

use super::OperationKind;

/// Summary of one retried operation.
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub operation: OperationKind,
    pub attempts: u8,
    pub success: bool,
    /// Wall time from the first attempt to the final result.
    pub elapsed: Duration,
}

impl RetryOutcome {
    pub fn log(&self) {
        if self.success {
            event!(
                Level::INFO,
                operation = %self.operation,
                attempts = self.attempts,
                elapsed_ms = self.elapsed.as_millis() as u64,
                "retry.outcome"
            );
        } else {
            event!(
                Level::WARN,
                operation = %self.operation,
                attempts = self.attempts,
                elapsed_ms = self.elapsed.as_millis() as u64,
                "retry.exhausted"
            );
        }
    }
}
