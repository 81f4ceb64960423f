//! Doubling backoff used while waiting on a result object.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default first delay.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(250);

/// Default ceiling on the delay value.
pub const DEFAULT_DELAY_CEILING: Duration = Duration::from_millis(64_000);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackoffError {
    #[error("initial delay must be greater than zero")]
    ZeroInitialDelay,
    #[error("delay ceiling ({ceiling:?}) must not be below the initial delay ({initial:?})")]
    CeilingBelowInitial { initial: Duration, ceiling: Duration },
}

/// Exponential backoff bounded by the delay value, not by elapsed time.
///
/// Delays start at `initial` and double after every attempt; the schedule ends
/// once the next delay would reach or exceed `ceiling`. With the defaults
/// (250 ms, 64 s) that is eight waits: 250 ms .. 32 s, about 64 s in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffSchedule {
    initial: Duration,
    ceiling: Duration,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            initial: DEFAULT_INITIAL_DELAY,
            ceiling: DEFAULT_DELAY_CEILING,
        }
    }
}

impl BackoffSchedule {
    pub fn new(initial: Duration, ceiling: Duration) -> Result<Self, BackoffError> {
        if initial.is_zero() {
            return Err(BackoffError::ZeroInitialDelay);
        }
        if ceiling < initial {
            return Err(BackoffError::CeilingBelowInitial { initial, ceiling });
        }
        Ok(Self { initial, ceiling })
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Fresh iterator over the delays of this schedule.
    pub fn delays(&self) -> Delays {
        Delays {
            next: Some(self.initial),
            ceiling: self.ceiling,
        }
    }

    /// Sum of every delay in the schedule.
    pub fn total_wait(&self) -> Duration {
        self.delays().sum()
    }
}

/// Iterator over backoff delays.
#[derive(Debug, Clone)]
pub struct Delays {
    next: Option<Duration>,
    ceiling: Duration,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next.filter(|d| *d < self.ceiling)?;
        self.next = current.checked_mul(2);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_doubles_until_ceiling() {
        let delays: Vec<u128> = BackoffSchedule::default()
            .delays()
            .map(|d| d.as_millis())
            .collect();

        assert_eq!(
            delays,
            vec![250, 500, 1_000, 2_000, 4_000, 8_000, 16_000, 32_000]
        );
        assert_eq!(
            BackoffSchedule::default().total_wait(),
            Duration::from_millis(63_750)
        );
    }

    #[test]
    fn ceiling_equal_to_initial_means_no_waits() {
        let s = BackoffSchedule::new(Duration::from_millis(10), Duration::from_millis(10)).unwrap();
        assert_eq!(s.delays().count(), 0);
    }

    #[test]
    fn ceiling_just_above_a_delay_includes_it() {
        let s = BackoffSchedule::new(Duration::from_millis(10), Duration::from_millis(41)).unwrap();
        let delays: Vec<u128> = s.delays().map(|d| d.as_millis()).collect();
        assert_eq!(delays, vec![10, 20, 40]);
    }

    #[test]
    fn invalid_schedules_are_rejected() {
        assert_eq!(
            BackoffSchedule::new(Duration::ZERO, Duration::from_secs(1)),
            Err(BackoffError::ZeroInitialDelay)
        );
        assert!(matches!(
            BackoffSchedule::new(Duration::from_secs(2), Duration::from_secs(1)),
            Err(BackoffError::CeilingBelowInitial { .. })
        ));
    }

    #[test]
    fn huge_ceiling_terminates_on_overflow() {
        let s = BackoffSchedule::new(Duration::from_secs(1), Duration::MAX).unwrap();
        assert!(s.delays().count() < 128);
    }
}
