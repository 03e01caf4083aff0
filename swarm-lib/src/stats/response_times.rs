use std::{collections::BTreeMap, time::Duration};

/// Percentiles reported for every stats row.
pub const PERCENTILES: [f64; 11] = [
    0.50, 0.66, 0.75, 0.80, 0.90, 0.95, 0.98, 0.99, 0.999, 0.9999, 1.0,
];

/// Bucketed distribution of response times, in milliseconds.
///
/// Small values are stored exactly, larger ones get rounded so
/// the number of buckets stays small for long running tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseTimes {
    buckets: BTreeMap<u64, u64>,
    count: u64,
}

impl ResponseTimes {
    pub fn record(&mut self, latency: Duration) {
        let bucket = round_response_time(latency.as_secs_f64() * 1000.);
        *self.buckets.entry(bucket).or_default() += 1;
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Nearest-rank percentile in milliseconds, `percent` within `[0, 1]`.
    ///
    /// Returns `None` when nothing was recorded yet.
    pub fn percentile(&self, percent: f64) -> Option<u64> {
        if self.count == 0 {
            return None;
        }

        let percent = percent.clamp(0., 1.);
        let rank = ((self.count as f64 * percent).ceil() as u64).clamp(1, self.count);

        let mut seen = 0;
        for (bucket, count) in &self.buckets {
            seen += count;
            if seen >= rank {
                return Some(*bucket);
            }
        }
        self.buckets.last_key_value().map(|(bucket, _)| *bucket)
    }

    pub fn median(&self) -> Option<u64> {
        self.percentile(0.5)
    }
}

/// Round a response time (ms) to the bucket it is stored in.
///
/// - `< 100ms`: nearest ms
/// - `< 1s`: nearest 10ms
/// - `< 10s`: nearest 100ms
/// - otherwise: nearest second
pub fn round_response_time(ms: f64) -> u64 {
    let ms = ms.max(0.);
    let step = if ms < 100. {
        1.
    } else if ms < 1_000. {
        10.
    } else if ms < 10_000. {
        100.
    } else {
        1_000.
    };
    ((ms / step).round() * step) as u64
}
