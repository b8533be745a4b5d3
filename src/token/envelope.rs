use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::types::TokenResponse;

/// Serializable form of an access token, timestamps in seconds since the epoch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenSnapshot {
    pub value: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

impl TokenSnapshot {
    /// Builds a snapshot from a token endpoint response received at `now`.
    pub fn from_response(resp: TokenResponse, now: SystemTime) -> Self {
        let issued_at = secs_since_epoch(now);
        Self {
            value: resp.access_token,
            issued_at,
            expires_at: issued_at.saturating_add(resp.expires_in),
        }
    }

    pub fn issued_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.issued_at)
    }

    pub fn expires_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.expires_at)
    }
}

/// A bearer token plus the timestamps needed for refresh decisions.
#[derive(Clone, Debug)]
pub struct TokenEnvelope {
    value: String,
    issued_at: SystemTime,
    expires_at: SystemTime,
    refresh_in_progress: bool,
}

impl TokenEnvelope {
    /// Rejects tokens living less than 60 seconds; they would be refreshed
    /// on every request.
    pub fn try_new(value: String, issued_at: SystemTime, expires_at: SystemTime) -> Result<Self, Error> {
        if value.is_empty() {
            return Err(Error::Config("Access token must not be empty".into()));
        }
        if expires_at <= issued_at {
            return Err(Error::Config("Token expires before or at issuance".into()));
        }
        let ttl = expires_at
            .duration_since(issued_at)
            .map_err(|_| Error::Config("Token TTL underflow".into()))?;
        if ttl < Duration::from_secs(60) {
            return Err(Error::Config(
                "Token TTL must be at least 60 seconds to support proactive refresh".into(),
            ));
        }
        Ok(Self {
            value,
            issued_at,
            expires_at,
            refresh_in_progress: false,
        })
    }

    pub fn from_snapshot(snapshot: TokenSnapshot) -> Result<Self, Error> {
        let issued_at = snapshot.issued_at();
        let expires_at = snapshot.expires_at();
        Self::try_new(snapshot.value, issued_at, expires_at)
    }

    pub fn to_snapshot(&self) -> TokenSnapshot {
        TokenSnapshot {
            value: self.value.clone(),
            issued_at: secs_since_epoch(self.issued_at),
            expires_at: secs_since_epoch(self.expires_at),
        }
    }

    /// Raw token value for the Authorization header.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> SystemTime {
        self.issued_at
    }

    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    pub fn refresh_in_progress(&self) -> bool {
        self.refresh_in_progress
    }

    pub fn set_refresh_in_progress(&mut self, refreshing: bool) {
        self.refresh_in_progress = refreshing;
    }

    /// Time left before expiry, `None` once expired.
    pub fn remaining(&self, now: SystemTime) -> Option<Duration> {
        self.expires_at.duration_since(now).ok()
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.expires_at.duration_since(self.issued_at).ok()
    }
}

fn secs_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}
