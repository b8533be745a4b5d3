use std::str::FromStr;
use std::time::Duration;

use rand::Rng;

use crate::errors::Error;

/// How randomness is mixed into the exponential backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JitterStrategy {
    /// Anywhere between zero and the exponential delay.
    Full,
    /// Half the exponential delay plus a random share of the other half.
    Equal,
    /// Between the initial delay and three times the previous delay,
    /// independent of the attempt number.
    Decorrelated,
}

/// Backoff settings shared by token and ingest requests.
#[derive(Clone, Debug)]
pub struct RetryPlan {
    pub max_attempts: u8,
    pub initial_delay: Duration,
    pub multiplier: f32,
    pub max_delay: Duration,
    pub jitter: JitterStrategy,
}

impl RetryPlan {
    pub fn new(
        max_attempts: u8,
        initial_delay: Duration,
        multiplier: f32,
        max_delay: Duration,
        jitter: JitterStrategy,
    ) -> Self {
        Self {
            max_attempts,
            initial_delay,
            multiplier,
            max_delay,
            jitter,
        }
    }

    pub fn default_plan() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(200),
            multiplier: 1.8,
            max_delay: Duration::from_secs(5),
            jitter: JitterStrategy::Equal,
        }
    }

    /// Exponential delay before `attempt` without jitter: `initial_delay`
    /// before attempt 2, multiplied for each later attempt, capped at
    /// `max_delay`.
    pub fn backoff_ceiling(&self, attempt: u8) -> Duration {
        if attempt <= 2 {
            return self.initial_delay.min(self.max_delay);
        }
        let exp = f64::from(self.multiplier).powi(i32::from(attempt) - 2);
        self.initial_delay.mul_f64(exp).min(self.max_delay)
    }

    /// Jittered delay before `attempt`. `previous` is the delay slept before
    /// the prior attempt, or `initial_delay` when there was none.
    pub fn delay_for_attempt(
        &self,
        attempt: u8,
        previous: Duration,
        rng: &mut impl Rng,
    ) -> Duration {
        let ceiling = self.backoff_ceiling(attempt);
        let delay = match self.jitter {
            JitterStrategy::Full => ceiling.mul_f64(rng.gen_range(0.0..=1.0)),
            JitterStrategy::Equal => {
                let half = ceiling / 2;
                half + half.mul_f64(rng.gen_range(0.0..=1.0))
            }
            JitterStrategy::Decorrelated => {
                let low = self.initial_delay.as_secs_f64();
                let high = (previous.as_secs_f64() * 3.0).max(low);
                Duration::from_secs_f64(rng.gen_range(low..=high))
            }
        };
        delay.min(self.max_delay)
    }
}

impl FromStr for JitterStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(JitterStrategy::Full),
            "equal" => Ok(JitterStrategy::Equal),
            "decorrelated" => Ok(JitterStrategy::Decorrelated),
            other => Err(Error::Config(format!(
                "Unknown jitter strategy '{}'; expected 'full', 'equal' or 'decorrelated'",
                other
            ))),
        }
    }
}
