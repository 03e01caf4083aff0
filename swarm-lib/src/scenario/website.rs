use rama::error::{BoxError, ErrorContext as _};

use super::{OnStart, Scenario, Task, WaitTime};

/// Minimum think time in seconds between two actions of a website user.
pub const WAIT_TIME_MIN_SECS: f64 = 5.;
/// Maximum think time in seconds between two actions of a website user.
pub const WAIT_TIME_MAX_SECS: f64 = 15.;

/// A visitor of the website which keeps on requesting the hello page.
///
/// - waits between 5 and 15 seconds before every action;
/// - does nothing special when it starts;
/// - has a single action `index`: `GET /hello`.
pub fn website_user() -> Result<Scenario, BoxError> {
    Scenario::try_new(
        "WebsiteUser",
        WaitTime::between(WAIT_TIME_MIN_SECS, WAIT_TIME_MAX_SECS)?,
        OnStart::Noop,
        vec![Task::get("index", "/hello")],
    )
    .context("create website user scenario")
}
