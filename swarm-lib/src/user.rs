//! A single simulated user.
//!
//! The user runs the `on_start` hook of its scenario once,
//! after which it keeps on looping until it gets cancelled:
//! wait a think time, pick an action, execute it and
//! report the outcome to the stats sink.

use std::{sync::Arc, time::Duration};

use rama::{
    Service as _,
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    http::{Body, BodyExtractExt as _, Request},
    telemetry::tracing,
};
use rand::rngs::StdRng;
use tokio::{sync::mpsc, time::Instant};

use crate::{
    client::{HttpClient, TargetHost},
    scenario::{OnStart, Scenario, Task},
    stats::{Failure, RequestEvent},
};

/// Default maximum duration of a single request, body included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct SimulatedUser {
    id: usize,
    scenario: Arc<Scenario>,
    client: HttpClient,
    host: TargetHost,
    request_timeout: Duration,
    rng: StdRng,
    results: mpsc::Sender<RequestEvent>,
}

impl SimulatedUser {
    pub fn new(
        id: usize,
        scenario: Arc<Scenario>,
        client: HttpClient,
        host: TargetHost,
        rng: StdRng,
        results: mpsc::Sender<RequestEvent>,
    ) -> Self {
        Self {
            id,
            scenario,
            client,
            host,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            rng,
            results,
        }
    }

    rama::utils::macros::generate_set_and_with! {
        /// Set the maximum duration of a single request.
        pub fn request_timeout(mut self, timeout: Duration) -> Self {
            self.request_timeout = timeout;
            self
        }
    }

    /// Run this user until the guard is cancelled
    /// or the stats sink is closed.
    pub async fn run(mut self, guard: ShutdownGuard) {
        let scenario = self.scenario.clone();
        tracing::debug!(user.id = self.id, scenario = scenario.name(), "simulated user started");

        match scenario.on_start() {
            OnStart::Noop => {
                tracing::debug!(user.id = self.id, "on_start: nothing to do");
            }
            OnStart::Request(task) => {
                tracing::trace!(user.id = self.id, %task, "on_start: execute request");
                let ev = tokio::select! {
                    _ = guard.cancelled() => {
                        tracing::debug!(user.id = self.id, "user cancelled during on_start");
                        return;
                    }
                    ev = self.execute(task) => ev,
                };
                if !self.report(ev).await {
                    return;
                }
            }
        }

        loop {
            let wait = scenario.wait_time().sample(&mut self.rng);
            tracing::trace!(user.id = self.id, ?wait, "think before next action");

            tokio::select! {
                _ = guard.cancelled() => {
                    tracing::debug!(user.id = self.id, "user cancelled while waiting");
                    return;
                }
                _ = tokio::time::sleep(wait) => (),
            }

            let task = scenario.pick_task(&mut self.rng);
            let ev = tokio::select! {
                _ = guard.cancelled() => {
                    tracing::debug!(user.id = self.id, %task, "user cancelled during action");
                    return;
                }
                ev = self.execute(task) => ev,
            };
            if !self.report(ev).await {
                return;
            }
        }
    }

    async fn report(&self, ev: RequestEvent) -> bool {
        if let Err(err) = self.results.send(ev).await {
            tracing::debug!(user.id = self.id, "stats sink closed, stop user: {err}");
            return false;
        }
        true
    }

    /// Execute a single task and classify its outcome.
    async fn execute(&self, task: &Task) -> RequestEvent {
        let start = Instant::now();
        let result = tokio::time::timeout(self.request_timeout, self.send(task)).await;
        let latency = start.elapsed();

        let (status, content_length, failure) = match result {
            Ok(Ok((status, content_length))) => {
                if (200..400).contains(&status) {
                    (Some(status), content_length, None)
                } else {
                    (
                        Some(status),
                        content_length,
                        Some(Failure::HttpStatus(status)),
                    )
                }
            }
            Ok(Err(err)) => {
                tracing::debug!(user.id = self.id, %task, "request failed: {err}");
                (None, 0, Some(Failure::Transport(err.to_string())))
            }
            Err(_) => {
                tracing::debug!(user.id = self.id, %task, "request timed out");
                (
                    None,
                    0,
                    Some(Failure::Transport(format!(
                        "request timed out after {}",
                        humantime::format_duration(self.request_timeout)
                    ))),
                )
            }
        };

        RequestEvent {
            user: self.id,
            name: task.name().to_owned(),
            method: task.method().clone(),
            path: task.path().to_owned(),
            latency,
            content_length,
            status,
            failure,
        }
    }

    async fn send(&self, task: &Task) -> Result<(u16, usize), BoxError> {
        let mut req = Request::new(Body::empty());
        *req.method_mut() = task.method().clone();
        *req.uri_mut() = self.host.join(task.path())?;

        let resp = self.client.serve(req).await?;
        let status = resp.status().as_u16();

        let body = resp
            .try_into_string()
            .await
            .context("read response body")?;

        Ok((status, body.len()))
    }
}
