use std::{fmt, str::FromStr, time::Duration};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::InvalidArgument;

#[cfg(test)]
mod tests;

/// Wait used by [`Debounce::with_default_wait`](crate::Debounce::with_default_wait)
/// and by `None` passed as a debounce wait.
pub const DEFAULT_DEBOUNCE_WAIT: Duration = Duration::from_millis(250);

/// A validated delay.
///
/// Parsed from a number of milliseconds or from a literal with a unit suffix.
///
/// | Suffix | Equivalent to                 |
/// |--------|-------------------------------|
/// | `ms`   | `Duration::from_millis(n)`    |
/// | `s`    | `Duration::from_secs(n)`      |
/// | `m`    | `Duration::from_secs(n * 60)` |
///
/// A literal without a suffix is read as milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Delay(Duration);

impl Delay {
    pub const ZERO: Self = Self(Duration::ZERO);

    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }
    pub const fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    /// Builds a delay from a millisecond count, rejecting negative and non-finite values.
    pub fn try_from_millis_f64(ms: f64) -> Result<Self, InvalidArgument> {
        if !ms.is_finite() || ms < 0.0 {
            return Err(InvalidArgument::new(format!(
                "delay must be non-negative and finite, got {ms}"
            )));
        }
        Duration::try_from_secs_f64(ms / 1000.0)
            .map(Self)
            .map_err(|_| InvalidArgument::new(format!("delay is out of range, got {ms}ms")))
    }

    pub const fn as_duration(self) -> Duration {
        self.0
    }
}
impl From<Duration> for Delay {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}
impl From<Delay> for Duration {
    fn from(value: Delay) -> Self {
        value.0
    }
}
impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.as_nanos();
        if nanos % 1_000_000 == 0 {
            write!(f, "{}ms", nanos / 1_000_000)
        } else {
            write!(f, "{}ms", nanos as f64 / 1_000_000.0)
        }
    }
}

impl FromStr for Delay {
    type Err = InvalidArgument;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(InvalidArgument::new("delay literal is empty"));
        }
        let (number, scale) = if let Some(prefix) = s.strip_suffix("ms") {
            (prefix, 1.0)
        } else if let Some(prefix) = s.strip_suffix('s') {
            (prefix, 1000.0)
        } else if let Some(prefix) = s.strip_suffix('m') {
            (prefix, 60_000.0)
        } else {
            (s, 1.0)
        };
        let number = number.trim();
        if number.is_empty() {
            return Err(InvalidArgument::new(format!(
                "invalid delay literal `{raw}`"
            )));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| InvalidArgument::new(format!("invalid delay number `{raw}`")))?;
        Self::try_from_millis_f64(value * scale)
    }
}

impl Serialize for Delay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
impl<'de> Deserialize<'de> for Delay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DelayVisitor;

        impl de::Visitor<'_> for DelayVisitor {
            type Value = Delay;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a number of milliseconds or a delay literal such as \"250ms\"")
            }
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Delay, E> {
                Ok(Delay::from_millis(v))
            }
            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Delay, E> {
                u64::try_from(v)
                    .map(Delay::from_millis)
                    .map_err(|_| E::custom(format!("delay must be non-negative, got {v}")))
            }
            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Delay, E> {
                Delay::try_from_millis_f64(v).map_err(E::custom)
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<Delay, E> {
                v.parse().map_err(E::custom)
            }
        }
        deserializer.deserialize_any(DelayVisitor)
    }
}

/// Values accepted where a wrapper expects a wait or delay.
///
/// Conversion is lenient: invalid input (negative, NaN, infinite, unparseable) becomes zero.
/// Use [`Delay`]'s `FromStr` or [`Delay::try_from_millis_f64`] to reject such input instead.
pub trait IntoDelay {
    /// Converts into a duration, using `default` when the value is unspecified.
    fn into_delay_or(self, default: Duration) -> Duration;

    fn into_delay(self) -> Duration
    where
        Self: Sized,
    {
        self.into_delay_or(Duration::ZERO)
    }
}
impl IntoDelay for Duration {
    fn into_delay_or(self, _default: Duration) -> Duration {
        self
    }
}
impl IntoDelay for Delay {
    fn into_delay_or(self, _default: Duration) -> Duration {
        self.0
    }
}
impl IntoDelay for u64 {
    fn into_delay_or(self, _default: Duration) -> Duration {
        Duration::from_millis(self)
    }
}
impl IntoDelay for u32 {
    fn into_delay_or(self, _default: Duration) -> Duration {
        Duration::from_millis(self.into())
    }
}
impl IntoDelay for i64 {
    fn into_delay_or(self, _default: Duration) -> Duration {
        match u64::try_from(self) {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => coerced(self),
        }
    }
}
impl IntoDelay for i32 {
    fn into_delay_or(self, default: Duration) -> Duration {
        i64::from(self).into_delay_or(default)
    }
}
impl IntoDelay for f64 {
    fn into_delay_or(self, _default: Duration) -> Duration {
        Delay::try_from_millis_f64(self)
            .map(Delay::as_duration)
            .unwrap_or_else(|_| coerced(self))
    }
}
impl IntoDelay for &str {
    fn into_delay_or(self, _default: Duration) -> Duration {
        self.parse::<Delay>()
            .map(Delay::as_duration)
            .unwrap_or_else(|_| coerced(self))
    }
}
impl IntoDelay for &String {
    fn into_delay_or(self, default: Duration) -> Duration {
        self.as_str().into_delay_or(default)
    }
}
impl IntoDelay for String {
    fn into_delay_or(self, default: Duration) -> Duration {
        self.as_str().into_delay_or(default)
    }
}
impl<T: IntoDelay> IntoDelay for Option<T> {
    fn into_delay_or(self, default: Duration) -> Duration {
        match self {
            Some(value) => value.into_delay_or(default),
            None => default,
        }
    }
}

fn coerced(value: impl fmt::Debug) -> Duration {
    tracing::warn!(?value, "invalid delay coerced to zero");
    Duration::ZERO
}
