//! Backoff schedules defining the wait between connection attempts.

use crate::error::ConfigError;
use std::time::Duration;

/// Ordered, non-empty list of waits applied between successive attempts of
/// one session.
///
/// The first attempt of a session is always immediate. After the attempt at
/// zero-based index `i` fails, the controller waits
/// `delays[min(i, len - 1)]` before trying again, so the schedule saturates
/// at its last entry.
///
/// # Examples
///
/// ```
/// use reconnector::DelaySchedule;
/// use std::time::Duration;
///
/// let schedule = DelaySchedule::from_millis([100, 1000, 5000]).unwrap();
///
/// assert_eq!(schedule.delay_for_attempt(0), Duration::from_millis(100));
/// assert_eq!(schedule.delay_for_attempt(1), Duration::from_millis(1000));
/// assert_eq!(schedule.delay_for_attempt(7), Duration::from_millis(5000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelaySchedule {
    delays: Vec<Duration>,
}

impl DelaySchedule {
    /// Default schedule: 100ms, 1s, 5s, 30s.
    pub const DEFAULT_MILLIS: [u64; 4] = [100, 1_000, 5_000, 30_000];

    /// Creates a schedule from explicit durations.
    ///
    /// Fails with [`ConfigError::EmptySchedule`] if `delays` is empty.
    pub fn new<I>(delays: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = Duration>,
    {
        let delays: Vec<Duration> = delays.into_iter().collect();
        if delays.is_empty() {
            return Err(ConfigError::EmptySchedule);
        }
        Ok(Self { delays })
    }

    /// Creates a schedule from raw millisecond values.
    ///
    /// Every entry must be a non-negative integer; the first offending entry
    /// is reported by index.
    pub fn from_millis<I>(delays: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = i64>,
    {
        let delays = delays
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                u64::try_from(value)
                    .map(Duration::from_millis)
                    .map_err(|_| ConfigError::InvalidDelay { index, value })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(delays)
    }

    /// Creates a single-entry schedule: every retry waits `delay`.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delays: vec![delay],
        }
    }

    /// Creates a doubling schedule from `initial` up to and including `max`.
    ///
    /// ```
    /// use reconnector::DelaySchedule;
    /// use std::time::Duration;
    ///
    /// let schedule =
    ///     DelaySchedule::exponential(Duration::from_millis(100), Duration::from_millis(500));
    /// assert_eq!(
    ///     schedule.as_slice(),
    ///     &[
    ///         Duration::from_millis(100),
    ///         Duration::from_millis(200),
    ///         Duration::from_millis(400),
    ///         Duration::from_millis(500),
    ///     ]
    /// );
    /// ```
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        let mut delays = Vec::new();
        let mut current = initial.min(max);
        loop {
            delays.push(current);
            if current >= max || current.is_zero() {
                break;
            }
            current = current.saturating_mul(2).min(max);
        }
        Self { delays }
    }

    /// Returns the wait that follows the failure of the attempt at `attempt`
    /// (zero-based) within a session.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let last = self.delays.len() - 1;
        self.delays[attempt.min(last)]
    }

    /// Returns the configured delays.
    pub fn as_slice(&self) -> &[Duration] {
        &self.delays
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    /// Always false; a schedule holds at least one entry.
    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }
}

impl Default for DelaySchedule {
    fn default() -> Self {
        Self {
            delays: Self::DEFAULT_MILLIS
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
        }
    }
}

impl From<Duration> for DelaySchedule {
    fn from(delay: Duration) -> Self {
        Self::fixed(delay)
    }
}
