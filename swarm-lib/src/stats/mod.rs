//! Aggregation of request outcomes into per action statistics.
//!
//! The [`StatsCollector`] is owned by a single report worker,
//! results are fed to it over a channel by the simulated users.

use std::{collections::BTreeMap, fmt, time::Duration};

use rama::http::Method;
use serde::Serialize;

mod response_times;

pub use self::response_times::{PERCENTILES, ResponseTimes, round_response_time};

/// Why a request is considered failed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Failure {
    /// A response was received, but with an unexpected status code.
    HttpStatus(u16),
    /// No (complete) response was received: connection errors, timeouts, ...
    Transport(String),
}

impl Failure {
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::HttpStatus(_) => "http_status",
            Failure::Transport(_) => "transport",
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::HttpStatus(status) => write!(f, "unexpected HTTP status {status}"),
            Failure::Transport(msg) => msg.fmt(f),
        }
    }
}

/// Outcome of one request issued by a simulated user.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    /// id of the simulated user which issued the request
    pub user: usize,
    /// name of the task (action)
    pub name: String,
    pub method: Method,
    pub path: String,
    pub latency: Duration,
    pub content_length: usize,
    pub status: Option<u16>,
    pub failure: Option<Failure>,
}

impl RequestEvent {
    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }
}

/// Statistics for a single `(method, name)` pair, or the total of all.
#[derive(Debug, Clone)]
pub struct RequestStats {
    method: Option<Method>,
    name: String,
    num_requests: u64,
    num_failures: u64,
    total_response_time: Duration,
    min_response_time: Option<Duration>,
    max_response_time: Duration,
    total_content_length: u64,
    response_times: ResponseTimes,
}

impl RequestStats {
    fn new(method: Option<Method>, name: impl Into<String>) -> Self {
        Self {
            method,
            name: name.into(),
            num_requests: 0,
            num_failures: 0,
            total_response_time: Duration::ZERO,
            min_response_time: None,
            max_response_time: Duration::ZERO,
            total_content_length: 0,
            response_times: ResponseTimes::default(),
        }
    }

    fn record(&mut self, ev: &RequestEvent) {
        self.num_requests += 1;
        if !ev.is_ok() {
            self.num_failures += 1;
        }

        self.total_response_time += ev.latency;
        self.min_response_time = Some(match self.min_response_time {
            Some(min) => min.min(ev.latency),
            None => ev.latency,
        });
        self.max_response_time = self.max_response_time.max(ev.latency);
        self.total_content_length += ev.content_length as u64;
        self.response_times.record(ev.latency);
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_requests(&self) -> u64 {
        self.num_requests
    }

    pub fn num_failures(&self) -> u64 {
        self.num_failures
    }

    pub fn fail_ratio(&self) -> f64 {
        if self.num_requests == 0 {
            return 0.;
        }
        self.num_failures as f64 / self.num_requests as f64
    }

    pub fn avg_response_time(&self) -> Option<Duration> {
        if self.num_requests == 0 {
            return None;
        }
        Some(match u32::try_from(self.num_requests) {
            Ok(n) => self.total_response_time / n,
            Err(_) => self
                .total_response_time
                .div_f64(self.num_requests as f64),
        })
    }

    pub fn min_response_time(&self) -> Option<Duration> {
        self.min_response_time
    }

    pub fn max_response_time(&self) -> Option<Duration> {
        (self.num_requests > 0).then_some(self.max_response_time)
    }

    pub fn avg_content_length(&self) -> u64 {
        self.total_content_length
            .checked_div(self.num_requests)
            .unwrap_or_default()
    }

    pub fn response_times(&self) -> &ResponseTimes {
        &self.response_times
    }

    /// Requests per second over the given elapsed run time.
    pub fn rps(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs <= 0. {
            return 0.;
        }
        self.num_requests as f64 / secs
    }

    pub fn snapshot(&self, elapsed: Duration) -> RequestStatsSnapshot {
        RequestStatsSnapshot {
            method: self.method.as_ref().map(ToString::to_string),
            name: self.name.clone(),
            num_requests: self.num_requests,
            num_failures: self.num_failures,
            fail_ratio: self.fail_ratio(),
            avg_response_time_ms: self.avg_response_time().map(duration_as_ms),
            min_response_time_ms: self.min_response_time().map(duration_as_ms),
            max_response_time_ms: self.max_response_time().map(duration_as_ms),
            median_response_time_ms: self.response_times.median(),
            avg_content_length: self.avg_content_length(),
            rps: self.rps(elapsed),
            percentiles_ms: PERCENTILES
                .iter()
                .filter_map(|p| {
                    self.response_times
                        .percentile(*p)
                        .map(|ms| (format_percentile(*p), ms))
                })
                .collect(),
        }
    }
}

/// Collects [`RequestEvent`]s into per action and total statistics.
#[derive(Debug, Clone)]
pub struct StatsCollector {
    entries: BTreeMap<(String, String), RequestStats>,
    total: RequestStats,
    failures: BTreeMap<FailureKey, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct FailureKey {
    method: String,
    name: String,
    error: String,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            total: RequestStats::new(None, "Aggregated"),
            failures: BTreeMap::new(),
        }
    }
}

impl StatsCollector {
    pub fn record(&mut self, ev: &RequestEvent) {
        self.entries
            .entry((ev.method.to_string(), ev.name.clone()))
            .or_insert_with(|| RequestStats::new(Some(ev.method.clone()), ev.name.clone()))
            .record(ev);
        self.total.record(ev);

        if let Some(failure) = &ev.failure {
            *self
                .failures
                .entry(FailureKey {
                    method: ev.method.to_string(),
                    name: ev.name.clone(),
                    error: failure.to_string(),
                })
                .or_default() += 1;
        }
    }

    /// Per action statistics, sorted by method and name.
    pub fn entries(&self) -> impl Iterator<Item = &RequestStats> {
        self.entries.values()
    }

    pub fn total(&self) -> &RequestStats {
        &self.total
    }

    pub fn has_failures(&self) -> bool {
        self.total.num_failures > 0
    }

    pub fn snapshot(&self, elapsed: Duration) -> StatsSnapshot {
        StatsSnapshot {
            elapsed_ms: duration_as_ms(elapsed),
            entries: self.entries().map(|s| s.snapshot(elapsed)).collect(),
            total: self.total.snapshot(elapsed),
            failures: self
                .failures
                .iter()
                .map(|(key, occurrences)| FailureSnapshot {
                    method: key.method.clone(),
                    name: key.name.clone(),
                    error: key.error.clone(),
                    occurrences: *occurrences,
                })
                .collect(),
        }
    }
}

/// Point in time view of all collected statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub elapsed_ms: f64,
    pub entries: Vec<RequestStatsSnapshot>,
    pub total: RequestStatsSnapshot,
    pub failures: Vec<FailureSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestStatsSnapshot {
    pub method: Option<String>,
    pub name: String,
    pub num_requests: u64,
    pub num_failures: u64,
    pub fail_ratio: f64,
    pub avg_response_time_ms: Option<f64>,
    pub min_response_time_ms: Option<f64>,
    pub max_response_time_ms: Option<f64>,
    pub median_response_time_ms: Option<u64>,
    pub avg_content_length: u64,
    pub rps: f64,
    pub percentiles_ms: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureSnapshot {
    pub method: String,
    pub name: String,
    pub error: String,
    pub occurrences: u64,
}

fn duration_as_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.
}

/// Format a percentile (`0.999`) as its label (`"99.9%"`).
pub fn format_percentile(p: f64) -> String {
    format!("{}%", (p * 10_000.).round() / 100.)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, latency_ms: u64, failure: Option<Failure>) -> RequestEvent {
        RequestEvent {
            user: 0,
            name: name.to_owned(),
            method: Method::GET,
            path: format!("/{name}"),
            latency: Duration::from_millis(latency_ms),
            content_length: 13,
            status: match &failure {
                Some(Failure::HttpStatus(status)) => Some(*status),
                Some(Failure::Transport(_)) => None,
                None => Some(200),
            },
            failure,
        }
    }

    #[test]
    fn test_format_percentile() {
        for (input, expected) in [
            (0.5, "50%"),
            (0.66, "66%"),
            (0.999, "99.9%"),
            (0.9999, "99.99%"),
            (1.0, "100%"),
        ] {
            assert_eq!(format_percentile(input), expected);
        }
    }

    #[test]
    fn test_empty_collector() {
        let stats = StatsCollector::default();
        assert_eq!(stats.entries().count(), 0);
        assert_eq!(stats.total().num_requests(), 0);
        assert_eq!(stats.total().avg_response_time(), None);
        assert_eq!(stats.total().max_response_time(), None);
        assert_eq!(stats.total().fail_ratio(), 0.);
        assert!(!stats.has_failures());

        let snapshot = stats.snapshot(Duration::from_secs(1));
        assert!(snapshot.entries.is_empty());
        assert!(snapshot.total.percentiles_ms.is_empty());
    }

    #[test]
    fn test_record_successes_and_failures() {
        let mut stats = StatsCollector::default();
        stats.record(&event("index", 10, None));
        stats.record(&event("index", 30, None));
        stats.record(&event("index", 20, Some(Failure::HttpStatus(500))));
        stats.record(&event(
            "index",
            40,
            Some(Failure::Transport("connection refused".to_owned())),
        ));
        stats.record(&event("index", 50, Some(Failure::HttpStatus(500))));

        let entries: Vec<_> = stats.entries().collect();
        assert_eq!(entries.len(), 1);

        let index = entries[0];
        assert_eq!(index.name(), "index");
        assert_eq!(index.method(), Some(&Method::GET));
        assert_eq!(index.num_requests(), 5);
        assert_eq!(index.num_failures(), 3);
        assert_eq!(index.fail_ratio(), 0.6);
        assert_eq!(index.avg_response_time(), Some(Duration::from_millis(30)));
        assert_eq!(index.min_response_time(), Some(Duration::from_millis(10)));
        assert_eq!(index.max_response_time(), Some(Duration::from_millis(50)));
        assert_eq!(index.avg_content_length(), 13);
        assert_eq!(index.response_times().median(), Some(30));
        assert_eq!(index.rps(Duration::from_secs(2)), 2.5);
        assert_eq!(index.rps(Duration::ZERO), 0.);

        assert_eq!(stats.total().num_requests(), 5);
        assert!(stats.has_failures());

        let snapshot = stats.snapshot(Duration::from_secs(1));
        assert_eq!(snapshot.total.fail_ratio, 0.6);
        assert_eq!(snapshot.failures.len(), 2);
        let occurrences: Vec<_> = snapshot
            .failures
            .iter()
            .map(|f| (f.error.as_str(), f.occurrences))
            .collect();
        assert!(occurrences.contains(&("unexpected HTTP status 500", 2)));
        assert!(occurrences.contains(&("connection refused", 1)));
    }

    #[test]
    fn test_entries_are_split_per_name() {
        let mut stats = StatsCollector::default();
        stats.record(&event("index", 10, None));
        stats.record(&event("login", 10, None));
        stats.record(&event("index", 10, None));

        let names: Vec<_> = stats.entries().map(|s| (s.name(), s.num_requests())).collect();
        assert_eq!(names, vec![("index", 2), ("login", 1)]);
        assert_eq!(stats.total().num_requests(), 3);
        assert_eq!(stats.total().name(), "Aggregated");
        assert_eq!(stats.total().method(), None);
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let mut stats = StatsCollector::default();
        stats.record(&event("index", 12, None));

        let value = serde_json::to_value(stats.snapshot(Duration::from_secs(1))).unwrap();
        assert_eq!(value["entries"][0]["name"], "index");
        assert_eq!(value["entries"][0]["method"], "GET");
        assert_eq!(value["entries"][0]["num_requests"], 1);
        assert_eq!(value["total"]["percentiles_ms"]["100%"], 12);
        assert_eq!(value["total"]["rps"], 1.0);
    }
}
