use std::time::Duration;

use swarmload_lib::stats::{RequestEvent, StatsCollector};

use super::{IntervalCounts, Reporter};

pub struct JsonlReporter {
    interval: Duration,
    last_tick: Duration,
    interval_counts: IntervalCounts,
    emit_events: bool,
}

impl JsonlReporter {
    pub fn new(interval: Duration, emit_events: bool) -> Self {
        Self {
            interval,
            last_tick: Duration::ZERO,
            interval_counts: IntervalCounts::default(),
            emit_events,
        }
    }
}

impl Reporter for JsonlReporter {
    fn on_result(&mut self, ev: &RequestEvent, elapsed: Duration) {
        self.interval_counts.apply(ev);

        if self.emit_events {
            println!("{}", event_line(ev, elapsed));
        }
    }

    fn on_tick(&mut self, stats: &StatsCollector, elapsed: Duration) {
        let since_last_tick = elapsed.saturating_sub(self.last_tick);
        if since_last_tick < self.interval {
            return;
        }
        self.last_tick = elapsed;

        let total = stats.total();
        let line = serde_json::json!({
            "type": "summary",
            "t_ms": elapsed.as_millis(),
            "interval_ms": since_last_tick.as_millis(),
            "rps": self.interval_counts.rps(since_last_tick),
            "interval": {
                "total": self.interval_counts.total,
                "ok": self.interval_counts.ok,
                "http_fail": self.interval_counts.http_fail,
                "transport_fail": self.interval_counts.transport_fail,
            },
            "total": {
                "total": total.num_requests(),
                "fail": total.num_failures(),
                "median_ms": total.response_times().median(),
            }
        });
        println!("{line}");

        self.interval_counts = IntervalCounts::default();
    }

    fn finish(&mut self, stats: &StatsCollector, elapsed: Duration) {
        println!("{}", final_line(stats, elapsed));
    }
}

fn event_line(ev: &RequestEvent, elapsed: Duration) -> serde_json::Value {
    serde_json::json!({
        "type": "event",
        "t_ms": elapsed.as_millis(),
        "user": ev.user,
        "name": ev.name,
        "method": ev.method.as_str(),
        "path": ev.path,
        "latency_ms": ev.latency.as_millis(),
        "ok": ev.is_ok(),
        "status": ev.status,
        "failure": ev.failure.as_ref().map(|failure| failure.kind()),
        "error": ev.failure.as_ref().map(ToString::to_string),
    })
}

fn final_line(stats: &StatsCollector, elapsed: Duration) -> serde_json::Value {
    serde_json::json!({
        "type": "final",
        "stats": stats.snapshot(elapsed),
    })
}
