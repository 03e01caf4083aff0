use std::{fmt::Write as _, time::Duration};

use swarmload_lib::stats::{
    PERCENTILES, RequestEvent, RequestStatsSnapshot, StatsCollector, StatsSnapshot,
    format_percentile,
};

use super::{IntervalCounts, Reporter};

pub struct HumanReporter {
    interval: Duration,
    last_tick: Duration,
    interval_counts: IntervalCounts,
}

impl HumanReporter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: Duration::ZERO,
            interval_counts: IntervalCounts::default(),
        }
    }
}

impl Reporter for HumanReporter {
    fn on_result(&mut self, ev: &RequestEvent, _elapsed: Duration) {
        self.interval_counts.apply(ev);
    }

    fn on_tick(&mut self, stats: &StatsCollector, elapsed: Duration) {
        let since_last_tick = elapsed.saturating_sub(self.last_tick);
        if since_last_tick < self.interval {
            return;
        }
        self.last_tick = elapsed;

        let total = stats.total();
        println!(
            "t={:.1}s rps={:.1} ok={} http_fail={} transport_fail={} total_reqs={} total_fail={} median={}",
            elapsed.as_secs_f64(),
            self.interval_counts.rps(since_last_tick),
            self.interval_counts.ok,
            self.interval_counts.http_fail,
            self.interval_counts.transport_fail,
            total.num_requests(),
            total.num_failures(),
            fmt_opt_ms(total.response_times().median()),
        );

        self.interval_counts = IntervalCounts::default();
    }

    fn finish(&mut self, stats: &StatsCollector, elapsed: Duration) {
        println!("{}", format_final_report(&stats.snapshot(elapsed)));
    }
}

const NAME_WIDTH: usize = 32;

/// Render the request, percentile and failure tables of a finished run.
pub(super) fn format_final_report(snapshot: &StatsSnapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{:<8} {:<NAME_WIDTH$} {:>8} {:>14} | {:>8} {:>8} {:>8} {:>8} | {:>8} {:>8}",
        "Type", "Name", "# reqs", "# fails", "Avg", "Min", "Max", "Med", "req/s", "avg size",
    );
    let separator = "-".repeat(NAME_WIDTH + 100);
    let _ = writeln!(out, "{separator}");
    for entry in &snapshot.entries {
        write_request_row(&mut out, entry);
    }
    let _ = writeln!(out, "{separator}");
    write_request_row(&mut out, &snapshot.total);

    let _ = writeln!(out);
    let _ = writeln!(out, "Response time percentiles (ms)");
    let _ = write!(out, "{:<8} {:<NAME_WIDTH$}", "Type", "Name");
    for p in PERCENTILES {
        let _ = write!(out, " {:>7}", format_percentile(p));
    }
    let _ = writeln!(out, " {:>8}", "# reqs");
    let _ = writeln!(out, "{separator}");
    for entry in &snapshot.entries {
        write_percentile_row(&mut out, entry);
    }
    let _ = writeln!(out, "{separator}");
    write_percentile_row(&mut out, &snapshot.total);

    if !snapshot.failures.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Error report");
        let _ = writeln!(out, "{:>12}  Error", "# occurrences");
        let _ = writeln!(out, "{separator}");
        for failure in &snapshot.failures {
            let _ = writeln!(
                out,
                "{:>13}  {} {}: {}",
                failure.occurrences, failure.method, failure.name, failure.error,
            );
        }
    }

    let _ = write!(out, "\nfinished after {:.1}s", snapshot.elapsed_ms / 1000.);
    out
}

fn write_request_row(out: &mut String, entry: &RequestStatsSnapshot) {
    let _ = writeln!(
        out,
        "{:<8} {:<NAME_WIDTH$} {:>8} {:>14} | {:>8} {:>8} {:>8} {:>8} | {:>8.2} {:>8}",
        entry.method.as_deref().unwrap_or_default(),
        truncate_name(&entry.name),
        entry.num_requests,
        format!("{}({:.2}%)", entry.num_failures, entry.fail_ratio * 100.),
        fmt_opt_ms_f64(entry.avg_response_time_ms),
        fmt_opt_ms_f64(entry.min_response_time_ms),
        fmt_opt_ms_f64(entry.max_response_time_ms),
        fmt_opt_ms(entry.median_response_time_ms),
        entry.rps,
        entry.avg_content_length,
    );
}

fn write_percentile_row(out: &mut String, entry: &RequestStatsSnapshot) {
    let _ = write!(
        out,
        "{:<8} {:<NAME_WIDTH$}",
        entry.method.as_deref().unwrap_or_default(),
        truncate_name(&entry.name),
    );
    for p in PERCENTILES {
        let value = entry.percentiles_ms.get(&format_percentile(p)).copied();
        let _ = write!(out, " {:>7}", fmt_opt_ms(value));
    }
    let _ = writeln!(out, " {:>8}", entry.num_requests);
}

fn truncate_name(name: &str) -> &str {
    match name.char_indices().nth(NAME_WIDTH) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

fn fmt_opt_ms(value: Option<u64>) -> String {
    value.map(|ms| ms.to_string()).unwrap_or_else(|| "N/A".to_owned())
}

fn fmt_opt_ms_f64(value: Option<f64>) -> String {
    value
        .map(|ms| format!("{ms:.0}"))
        .unwrap_or_else(|| "N/A".to_owned())
}
