mod envelope;
mod guard;

pub use envelope::{TokenEnvelope, TokenSnapshot};
pub use guard::{RefreshPolicy, RefreshReason, TokenGuard, TokenGuardConfig, TokenGuardResult};
