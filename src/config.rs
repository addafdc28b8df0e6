use std::time::Duration;

use derive_ex::derive_ex;
use serde::{Deserialize, Serialize};

use crate::{Debounce, Delay, Interval, InvalidArgument, Throttle, Timeout, DEFAULT_DEBOUNCE_WAIT};


/// Timing settings for the scheduling primitives.
///
/// Every field accepts a number of milliseconds or a delay literal such as `"250ms"`, `"1.5s"` or `"2m"`.
/// Missing fields take their default; unknown fields are rejected.
///
/// ```
/// let config = pacer::TimingConfig::from_json(r#"{ "debounce_wait": "300ms", "throttle_delay": 50 }"#).unwrap();
/// assert_eq!(config.debounce_wait.as_duration(), std::time::Duration::from_millis(300));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive_ex(Default)]
#[default(Self::new())]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    pub debounce_wait: Delay,
    pub throttle_delay: Delay,
    pub timeout_delay: Delay,
    pub interval_period: Delay,
}

impl TimingConfig {
    pub const fn new() -> Self {
        Self {
            debounce_wait: Delay::new(DEFAULT_DEBOUNCE_WAIT),
            throttle_delay: Delay::new(Duration::from_millis(100)),
            timeout_delay: Delay::new(Duration::from_secs(1)),
            interval_period: Delay::new(Duration::from_secs(1)),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, InvalidArgument> {
        serde_json::from_str(json)
            .map_err(|e| InvalidArgument::new(format!("invalid timing configuration: {e}")))
    }

    pub fn debounce<A: 'static, R: 'static>(
        &self,
        f: impl FnMut(A) -> R + 'static,
    ) -> Debounce<A, R> {
        Debounce::new(f, self.debounce_wait)
    }

    pub fn throttle<A: 'static, R: 'static>(
        &self,
        f: impl FnMut(A) -> R + 'static,
    ) -> Throttle<A, R> {
        Throttle::new(f, self.throttle_delay)
    }

    pub fn timeout(&self, callback: impl FnMut() + 'static) -> Timeout {
        Timeout::new(callback, Some(self.timeout_delay.as_duration()))
    }

    pub fn interval(&self, callback: impl FnMut() + 'static) -> Interval {
        Interval::new(callback, Some(self.interval_period.as_duration()))
    }
}
