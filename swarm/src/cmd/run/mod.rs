use std::time::Duration;

use rama::{
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    telemetry::tracing,
};

use clap::Args;
use swarmload_lib::{
    client::{self, TargetHost},
    runner::{self, RunConfig},
    stats::{RequestEvent, StatsCollector},
    user::DEFAULT_REQUEST_TIMEOUT,
    utils::env,
};
use tokio::{
    sync::mpsc::{self, Receiver},
    time::Instant,
};

use crate::config::{ScenarioKind, parse_humantime_duration};

pub mod reporter;

use self::reporter::*;

#[derive(Debug, Clone, Args)]
/// run a load test against a host
pub struct RunCommand {
    /// base URL of the host to load test, e.g. http://127.0.0.1:8080
    #[arg(long, value_name = "URL", required = true)]
    host: TargetHost,

    /// scenario that each simulated user runs
    #[arg(long, value_enum, default_value_t = ScenarioKind::default())]
    scenario: ScenarioKind,

    /// peak number of concurrent simulated users
    #[arg(long, short = 'u', value_name = "N", default_value_t = 1)]
    users: usize,

    /// simulated users started per second
    #[arg(long, short = 'r', value_name = "N", default_value_t = 1.)]
    spawn_rate: f64,

    /// stop after the given duration (e.g. 300s, 20m, 1h_30m),
    /// run until interrupted if not defined
    #[arg(long, short = 't', value_name = "DURATION", value_parser = parse_humantime_duration)]
    run_time: Option<Duration>,

    /// maximum duration of a single request
    #[arg(
        long,
        value_name = "DURATION",
        value_parser = parse_humantime_duration,
        default_value = "60s",
    )]
    request_timeout: Duration,

    /// seed used for reproducible think times and action picks
    #[arg(long)]
    seed: Option<u64>,

    /// report json instead of a human-friendly format
    #[arg(long, default_value_t = false)]
    json: bool,

    /// process exit code used when at least one request failed
    #[arg(long, value_name = "CODE", default_value_t = 1)]
    exit_code_on_error: i32,
}

/// Run the load test and return the exit code for the process.
pub async fn exec(guard: ShutdownGuard, args: RunCommand) -> Result<i32, BoxError> {
    let scenario = args.scenario.build().context("build scenario")?;
    let client = client::new_web_client().context("create HTTP(S) client")?;

    let request_timeout = if args.request_timeout.is_zero() {
        tracing::warn!("request timeout cannot be zero: use default");
        DEFAULT_REQUEST_TIMEOUT
    } else {
        args.request_timeout
    };

    let cfg = RunConfig {
        host: args.host,
        users: args.users,
        spawn_rate: args.spawn_rate,
        run_time: args.run_time,
        request_timeout,
        seed: args.seed,
    };

    const REPORT_INTERVAL: Duration = Duration::from_secs(1);

    let reporter: Box<dyn Reporter> = if args.json {
        const EMIT_EVENTS: bool = true;
        Box::new(JsonlReporter::new(REPORT_INTERVAL, EMIT_EVENTS))
    } else {
        Box::new(HumanReporter::new(REPORT_INTERVAL))
    };

    let (result_tx, result_rx) =
        mpsc::channel(env::compute_result_channel_capacity(args.users));
    let report_handle = tokio::spawn(report_worker(reporter, result_rx, REPORT_INTERVAL));

    let summary = runner::run(guard, scenario, client, cfg, result_tx)
        .await
        .context("run load test")?;

    let stats = report_handle.await.context("join report worker")?;

    tracing::info!(
        users = summary.users_spawned,
        requests = stats.total().num_requests(),
        failures = stats.total().num_failures(),
        "load test finished",
    );

    Ok(exit_code(&stats, args.exit_code_on_error))
}

fn exit_code(stats: &StatsCollector, exit_code_on_error: i32) -> i32 {
    if stats.has_failures() {
        exit_code_on_error
    } else {
        0
    }
}

/// Record all results until every sender is dropped,
/// after which the final report is emitted.
async fn report_worker(
    mut reporter: Box<dyn Reporter>,
    mut result_rx: Receiver<RequestEvent>,
    tick_interval: Duration,
) -> StatsCollector {
    let start = Instant::now();
    let mut stats = StatsCollector::default();

    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe_result = result_rx.recv() => {
                let Some(ev) = maybe_result else {
                    tracing::debug!("exit report worker: result senders closed");
                    break;
                };

                stats.record(&ev);
                reporter.on_result(&ev, start.elapsed());
            }

            _ = ticker.tick() => {
                reporter.on_tick(&stats, start.elapsed());
            }
        }
    }

    reporter.finish(&stats, start.elapsed());
    stats
}
