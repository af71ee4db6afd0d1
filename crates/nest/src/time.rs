use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

/// Default epoch: Sunday, January 1, 2017 00:00:00 UTC+8
pub const NEST_EPOCH: i64 = 1_483_200_000_000;

/// A source of wall-clock time in milliseconds since the Unix epoch.
///
/// The generator reads the clock once per ID (and repeatedly while waiting
/// out an exhausted sequence), always while holding its lock. Implementations
/// should be cheap and must not block.
///
/// # Example
///
/// ```
/// use nest::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> i64 {
///         1_483_200_001_000
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1_483_200_001_000);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since 1970-01-01 UTC.
    fn current_millis(&self) -> i64;
}

/// The system wall clock.
///
/// Unlike a monotonic clock this follows NTP corrections and manual
/// adjustments, which is exactly what lets the generator detect and report a
/// clock that moved backwards.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => i64::try_from(since.as_millis()).unwrap_or(i64::MAX),
            // A clock set before 1970; report it rather than panic so the
            // generator can reject it.
            Err(before) => i64::try_from(before.duration().as_millis()).map_or(i64::MIN, |ms| -ms),
        }
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> i64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> i64 {
        (**self).current_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_past_epoch() {
        let now = SystemClock.current_millis();
        assert!(now > NEST_EPOCH);
    }

    #[test]
    fn shared_clock_delegates() {
        let clock = Arc::new(SystemClock);
        let before = SystemClock.current_millis();
        let shared = clock.current_millis();
        assert!(shared >= before);
    }
}
