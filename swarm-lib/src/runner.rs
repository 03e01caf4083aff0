//! Minimal harness running many simulated users of one scenario.

use std::{sync::Arc, time::Duration};

use rama::{
    error::{BoxError, ErrorContext as _, ErrorExt as _},
    graceful::{Shutdown, ShutdownGuard},
    telemetry::tracing,
};
use rand::{RngExt as _, SeedableRng as _, rngs::StdRng};
use tokio::{sync::mpsc, time::Instant};

use crate::{
    client::{HttpClient, TargetHost},
    scenario::Scenario,
    stats::RequestEvent,
    user::{DEFAULT_REQUEST_TIMEOUT, SimulatedUser},
};

/// How a load test is run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Host all requests are sent to.
    pub host: TargetHost,
    /// Peak number of concurrent simulated users.
    pub users: usize,
    /// Users started per second until `users` are running.
    pub spawn_rate: f64,
    /// Stop after this duration, run until shutdown if `None`.
    pub run_time: Option<Duration>,
    /// Maximum duration of a single request.
    pub request_timeout: Duration,
    /// Seed for reproducible think times and task selection.
    pub seed: Option<u64>,
}

impl RunConfig {
    pub fn new(host: TargetHost) -> Self {
        Self {
            host,
            users: 1,
            spawn_rate: 1.,
            run_time: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            seed: None,
        }
    }

    fn validate(&self) -> Result<(), BoxError> {
        if self.users == 0 {
            return Err(BoxError::from("at least one user is required"));
        }
        if !self.spawn_rate.is_finite() || self.spawn_rate <= 0. {
            return Err(BoxError::from("spawn rate has to be a positive number")
                .context_field("spawn_rate", self.spawn_rate));
        }
        if self.request_timeout.is_zero() {
            return Err(BoxError::from("request timeout cannot be zero"));
        }
        self.ramp_up_offset(self.users - 1)
            .context_field("users", self.users)
            .context_field("spawn_rate", self.spawn_rate)?;
        Ok(())
    }

    /// Time between the start of the run and the spawn of user `id`.
    fn ramp_up_offset(&self, id: usize) -> Result<Duration, BoxError> {
        Duration::try_from_secs_f64(id as f64 / self.spawn_rate)
            .context("spawn rate too low to ramp up all users")
            .map_err(Into::into)
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of users that got spawned.
    pub users_spawned: usize,
    /// Wall time between the start of the run and the stop of the last user.
    pub elapsed: Duration,
}

/// Run the scenario until the run time elapsed or the guard got cancelled.
///
/// Every request outcome is sent to `results`. This function returns
/// once all simulated users stopped, at which point all clones of
/// the `results` sender created by this run are dropped.
pub async fn run(
    guard: ShutdownGuard,
    scenario: Scenario,
    client: HttpClient,
    cfg: RunConfig,
    results: mpsc::Sender<RequestEvent>,
) -> Result<RunSummary, BoxError> {
    cfg.validate()?;

    let start = Instant::now();
    let run_time = cfg.run_time;

    tracing::info!(
        scenario = scenario.name(),
        wait_time = %scenario.wait_time(),
        host = %cfg.host,
        users = cfg.users,
        spawn_rate = cfg.spawn_rate,
        run_time = ?run_time,
        "start load test",
    );

    let users_shutdown = Shutdown::new(async move {
        match run_time {
            Some(run_time) => tokio::select! {
                _ = guard.cancelled() => {
                    tracing::debug!("shutdown initiated: stop all users");
                }
                _ = tokio::time::sleep(run_time) => {
                    tracing::info!("run time limit reached: stop all users");
                }
            },
            None => {
                guard.cancelled().await;
                tracing::debug!("shutdown initiated: stop all users");
            }
        }
    });

    let (spawned_tx, mut spawned_rx) = mpsc::unbounded_channel();
    let spawner = Spawner {
        scenario: Arc::new(scenario),
        client,
        cfg,
        results,
        spawned: spawned_tx,
    };
    users_shutdown.spawn_task_fn(|guard| spawner.spawn_users(guard));

    users_shutdown.shutdown().await;

    let mut users_spawned = 0;
    while spawned_rx.recv().await.is_some() {
        users_spawned += 1;
    }

    let elapsed = start.elapsed();
    tracing::info!(users_spawned, ?elapsed, "all users stopped");

    Ok(RunSummary {
        users_spawned,
        elapsed,
    })
}

struct Spawner {
    scenario: Arc<Scenario>,
    client: HttpClient,
    cfg: RunConfig,
    results: mpsc::Sender<RequestEvent>,
    spawned: mpsc::UnboundedSender<usize>,
}

impl Spawner {
    /// Ramp up to the configured number of users at the configured spawn rate.
    async fn spawn_users(self, guard: ShutdownGuard) {
        let mut seed_rng = match self.cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let ramp_up_start = Instant::now();

        for id in 0..self.cfg.users {
            if id > 0 {
                let Some(deadline) = self
                    .cfg
                    .ramp_up_offset(id)
                    .ok()
                    .and_then(|offset| ramp_up_start.checked_add(offset))
                else {
                    tracing::warn!(users = id, "ramp up deadline out of range: stop spawning");
                    return;
                };
                tokio::select! {
                    _ = guard.cancelled() => {
                        tracing::debug!(users = id, "ramp up cancelled");
                        return;
                    }
                    _ = tokio::time::sleep_until(deadline) => (),
                }
            }

            let user = SimulatedUser::new(
                id,
                self.scenario.clone(),
                self.client.clone(),
                self.cfg.host.clone(),
                StdRng::seed_from_u64(seed_rng.random()),
                self.results.clone(),
            )
            .with_request_timeout(self.cfg.request_timeout);

            guard.spawn_task_fn(|guard| user.run(guard));
            let _ = self.spawned.send(id);
            tracing::debug!(user.id = id, "simulated user spawned");
        }

        tracing::info!(users = self.cfg.users, "all users spawned");
    }
}
