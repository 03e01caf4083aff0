use std::fmt;

use rama::{
    error::{BoxError, ErrorExt as _},
    http::Method,
};

/// A named, weighted action a simulated user may perform.
///
/// Each action issues a single request with a fixed method and path
/// against the target host of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    name: String,
    weight: u32,
    method: Method,
    path: String,
}

impl Task {
    /// Create a `GET {path}` task with weight 1.
    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: 1,
            method: Method::GET,
            path: path.into(),
        }
    }

    rama::utils::macros::generate_set_and_with! {
        /// Set the relative selection weight of this task.
        pub fn weight(mut self, weight: u32) -> Self {
            self.weight = weight;
            self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(super) fn validate(&self) -> Result<(), BoxError> {
        if self.name.is_empty() {
            return Err(BoxError::from("task name cannot be empty")
                .context_field("path", self.path.clone()));
        }
        if self.weight == 0 {
            return Err(BoxError::from("task weight has to be at least 1")
                .context_field("task", self.name.clone()));
        }
        if !self.path.starts_with('/') {
            return Err(BoxError::from("task path has to start with '/'")
                .context_field("task", self.name.clone())
                .context_field("path", self.path.clone()));
        }
        Ok(())
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.method, self.path, self.name)
    }
}
