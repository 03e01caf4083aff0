use std::time::Duration;

use swarmload_lib::stats::{RequestEvent, StatsCollector};

mod human;
mod json;

pub use self::{human::HumanReporter, json::JsonlReporter};

/// Presents the progress and outcome of a load test.
///
/// All methods get called from the single report worker,
/// which owns the [`StatsCollector`].
pub trait Reporter: Send + 'static {
    /// Called for every request outcome, after it got recorded in `stats`.
    fn on_result(&mut self, ev: &RequestEvent, elapsed: Duration);
    /// Called periodically while the load test is running.
    fn on_tick(&mut self, stats: &StatsCollector, elapsed: Duration);
    /// Called once all simulated users stopped.
    fn finish(&mut self, stats: &StatsCollector, elapsed: Duration);
}

/// Counts of requests since the previous tick.
#[derive(Debug, Default)]
struct IntervalCounts {
    total: u64,
    ok: u64,
    http_fail: u64,
    transport_fail: u64,
}

impl IntervalCounts {
    fn apply(&mut self, ev: &RequestEvent) {
        use swarmload_lib::stats::Failure;

        self.total += 1;
        match ev.failure {
            None => self.ok += 1,
            Some(Failure::HttpStatus(_)) => self.http_fail += 1,
            Some(Failure::Transport(_)) => self.transport_fail += 1,
        }
    }

    fn rps(&self, interval: Duration) -> f64 {
        let secs = interval.as_secs_f64();
        if secs == 0. {
            0.
        } else {
            self.total as f64 / secs
        }
    }
}
