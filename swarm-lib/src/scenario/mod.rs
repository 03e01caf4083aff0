//! Declarative description of a class of simulated users.
//!
//! A [`Scenario`] declares the think time between actions,
//! the weighted actions a user can pick from and an optional
//! hook that runs once per user before its action loop starts.
//!
//! Executing a scenario is the job of the [`runner`](crate::runner).

use rama::error::{BoxError, ErrorContext as _, ErrorExt as _};
use rand::{
    RngExt,
    distr::{Distribution as _, weighted::WeightedIndex},
};

mod task;
mod wait_time;

pub mod website;

pub use self::{task::Task, wait_time::WaitTime, website::website_user};

/// Hook executed exactly once per simulated user,
/// before its first action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OnStart {
    /// Nothing to do.
    #[default]
    Noop,
    /// Issue a single request, recorded like any other action.
    Request(Task),
}

#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    wait_time: WaitTime,
    on_start: OnStart,
    tasks: Vec<Task>,
    weights: WeightedIndex<u32>,
}

impl Scenario {
    /// Create a new [`Scenario`], validating all of its parts.
    ///
    /// Fails when no tasks are given or any task is invalid
    /// (empty name, zero weight or a path not starting with `/`).
    pub fn try_new(
        name: impl Into<String>,
        wait_time: WaitTime,
        on_start: OnStart,
        tasks: Vec<Task>,
    ) -> Result<Self, BoxError> {
        let name = name.into();

        if tasks.is_empty() {
            return Err(
                BoxError::from("scenario has no tasks defined").context_field("scenario", name)
            );
        }
        for task in &tasks {
            task.validate()
                .context("validate scenario task")
                .context_field("scenario", name.clone())?;
        }
        if let OnStart::Request(task) = &on_start {
            task.validate()
                .context("validate scenario on_start request")
                .context_field("scenario", name.clone())?;
        }

        let weights = WeightedIndex::new(tasks.iter().map(Task::weight))
            .context("create weighted task index")
            .context_field("scenario", name.clone())?;

        Ok(Self {
            name,
            wait_time,
            on_start,
            tasks,
            weights,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wait_time(&self) -> WaitTime {
        self.wait_time
    }

    pub fn on_start(&self) -> &OnStart {
        &self.on_start
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Replace the think time, keeping everything else as is.
    pub fn with_wait_time(mut self, wait_time: WaitTime) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Pick the next task, proportional to the task weights.
    pub fn pick_task<R: RngExt + ?Sized>(&self, rng: &mut R) -> &Task {
        if self.tasks.len() == 1 {
            return &self.tasks[0];
        }
        &self.tasks[self.weights.sample(rng)]
    }
}
