use std::fmt;
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::errors::Error;

use super::{TokenEnvelope, TokenSnapshot};

pub type TokenGuardResult<T> = Result<T, Error>;

/// When a cached token is considered too close to expiry to use.
#[derive(Clone, Debug)]
pub struct RefreshPolicy {
    /// Longest refresh window; shorter-lived tokens get a proportional one.
    pub threshold: Duration,
    /// Minimum time between refreshes that were not forced.
    pub min_cooldown: Duration,
    /// Added to the window to absorb clock differences with the authority.
    pub max_skew: Duration,
}

impl RefreshPolicy {
    pub fn new(
        threshold: Duration,
        min_cooldown: Duration,
        max_skew: Duration,
    ) -> Result<Self, Error> {
        if threshold.is_zero() {
            return Err(Error::Config("Refresh threshold must be > 0".into()));
        }
        if max_skew >= threshold {
            return Err(Error::Config(
                "Clock skew must be lower than the refresh threshold".into(),
            ));
        }
        Ok(Self {
            threshold,
            min_cooldown,
            max_skew,
        })
    }

    /// The lesser of 20% of the TTL and two minutes.
    pub fn derive_threshold(ttl: Duration) -> Duration {
        ttl.mul_f64(0.2).min(Duration::from_secs(120))
    }

    /// Remaining lifetime under which a token with `lifetime` is refreshed.
    fn window(&self, lifetime: Option<Duration>) -> Duration {
        let threshold = match lifetime {
            Some(ttl) => self.threshold.min(Self::derive_threshold(ttl)),
            None => self.threshold,
        };
        threshold + self.max_skew
    }
}

impl Default for RefreshPolicy {
    /// AAD app tokens live about an hour.
    fn default() -> Self {
        Self {
            threshold: Duration::from_secs(120),
            min_cooldown: Duration::from_secs(30),
            max_skew: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Default)]
pub struct TokenGuardConfig {
    pub policy: RefreshPolicy,
    /// Offset applied to the local clock before checking expiry.
    pub clock_skew: Duration,
}

/// Why the guard went back to the authority.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshReason {
    /// No token fetched yet.
    Missing,
    /// Inside the refresh window.
    Expiring,
    Expired,
    /// The caller saw the token rejected (ingest 401).
    Rejected,
}

impl fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RefreshReason::Missing => "missing",
            RefreshReason::Expiring => "expiring",
            RefreshReason::Expired => "expired",
            RefreshReason::Rejected => "rejected",
        })
    }
}

/// Caches the AAD access token for one client and replaces it when it nears
/// expiry or the cluster rejects it. Concurrent callers share one refresh.
pub struct TokenGuard {
    envelope: RwLock<Option<TokenEnvelope>>,
    policy: RefreshPolicy,
    refresh_lock: Mutex<()>,
    clock_skew: Duration,
    last_refresh: RwLock<Option<SystemTime>>,
}

impl TokenGuard {
    /// A guard with no token yet; the first `ensure_fresh` fetches one.
    pub fn empty(config: TokenGuardConfig) -> Self {
        Self {
            envelope: RwLock::new(None),
            policy: config.policy,
            refresh_lock: Mutex::new(()),
            clock_skew: config.clock_skew,
            last_refresh: RwLock::new(None),
        }
    }

    /// Returns the cached token, running `refresh_cb` first when the token is
    /// missing or expiring, or when `rejected` reports that the service
    /// refused it.
    pub async fn ensure_fresh<F, Fut>(
        &self,
        rejected: bool,
        refresh_cb: F,
    ) -> TokenGuardResult<TokenSnapshot>
    where
        F: FnOnce() -> Fut + Send,
        Fut: std::future::Future<Output = TokenGuardResult<TokenSnapshot>> + Send,
    {
        if !rejected {
            let last_refresh = { *self.last_refresh.read().await };
            let envelope = self.envelope.read().await;
            if let Some(envelope) = envelope.as_ref()
                && self.refresh_reason(envelope, last_refresh).is_none()
            {
                return Ok(envelope.to_snapshot());
            }
        }

        let _lock = self.refresh_lock.lock().await;
        let reason = {
            let last_refresh = { *self.last_refresh.read().await };
            let mut envelope = self.envelope.write().await;
            let reason = match envelope.as_ref() {
                None => RefreshReason::Missing,
                Some(_) if rejected => RefreshReason::Rejected,
                Some(current) => match self.refresh_reason(current, last_refresh) {
                    // Another caller refreshed while this one waited.
                    None => return Ok(current.to_snapshot()),
                    Some(reason) => reason,
                },
            };
            if let Some(current) = envelope.as_mut() {
                current.set_refresh_in_progress(true);
            }
            reason
        };

        let started = Instant::now();
        info!(reason = %reason, "token.refresh.start");
        let refreshed = match refresh_cb().await {
            Ok(snapshot) => TokenEnvelope::from_snapshot(snapshot),
            Err(err) => Err(err),
        };
        match refreshed {
            Ok(updated) => {
                let snapshot = updated.to_snapshot();
                info!(
                    reason = %reason,
                    expires_in_secs = snapshot.expires_at.saturating_sub(snapshot.issued_at),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "token.refresh.success"
                );
                *self.envelope.write().await = Some(updated);
                *self.last_refresh.write().await = Some(SystemTime::now());
                Ok(snapshot)
            }
            Err(err) => {
                error!(
                    reason = %reason,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "token.refresh.failure"
                );
                if let Some(current) = self.envelope.write().await.as_mut() {
                    current.set_refresh_in_progress(false);
                }
                Err(err)
            }
        }
    }

    fn refresh_reason(
        &self,
        envelope: &TokenEnvelope,
        last_refresh: Option<SystemTime>,
    ) -> Option<RefreshReason> {
        if envelope.refresh_in_progress() {
            return None;
        }
        let now = SystemTime::now();
        let remaining = match envelope.remaining(now + self.clock_skew) {
            Some(remaining) => remaining,
            None => {
                debug!("access token already expired");
                return Some(RefreshReason::Expired);
            }
        };
        if remaining > self.policy.window(envelope.lifetime()) {
            return None;
        }
        if let Some(last) = last_refresh
            && let Ok(elapsed) = now.duration_since(last)
            && elapsed < self.policy.min_cooldown
        {
            return None;
        }
        Some(RefreshReason::Expiring)
    }
}
