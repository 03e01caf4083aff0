use std::{fmt, time::Duration};

use rama::error::{BoxError, ErrorContext as _, ErrorExt as _};
use rand::RngExt;

/// Think time drawn before every action of a simulated user.
///
/// A concrete wait is picked uniformly at random from the closed
/// interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTime {
    min: Duration,
    max: Duration,
}

impl WaitTime {
    /// Create a [`WaitTime`] bounded by `min_secs` and `max_secs` (inclusive).
    ///
    /// Both bounds have to be finite and non-negative, and `min_secs <= max_secs`.
    pub fn between(min_secs: f64, max_secs: f64) -> Result<Self, BoxError> {
        let min = secs_to_duration(min_secs).context("invalid minimum wait time")?;
        let max = secs_to_duration(max_secs).context("invalid maximum wait time")?;
        Self::from_durations(min, max)
    }

    /// Create a [`WaitTime`] which always waits exactly `secs`.
    pub fn constant(secs: f64) -> Result<Self, BoxError> {
        let d = secs_to_duration(secs).context("invalid constant wait time")?;
        Ok(Self { min: d, max: d })
    }

    pub fn from_durations(min: Duration, max: Duration) -> Result<Self, BoxError> {
        if min > max {
            return Err(BoxError::from("minimum wait time exceeds maximum wait time")
                .context_debug_field("min", min)
                .context_debug_field("max", max));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn contains(&self, wait: Duration) -> bool {
        wait >= self.min && wait <= self.max
    }

    /// Draw a wait duration uniformly from `[min, max]`.
    pub fn sample<R: RngExt + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            return self.min;
        }

        let lo = duration_as_nanos(self.min);
        let hi = duration_as_nanos(self.max);
        Duration::from_nanos(rng.random_range(lo..=hi))
    }
}

impl fmt::Display for WaitTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "between({:.3}s, {:.3}s)",
            self.min.as_secs_f64(),
            self.max.as_secs_f64()
        )
    }
}

fn secs_to_duration(secs: f64) -> Result<Duration, BoxError> {
    if !secs.is_finite() || secs < 0. {
        return Err(BoxError::from("seconds have to be finite and non-negative")
            .context_field("seconds", secs));
    }
    Duration::try_from_secs_f64(secs).context("convert seconds to duration")
}

// durations beyond ~584 years are clamped, think times never get there
fn duration_as_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
