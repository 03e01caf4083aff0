use std::time::Duration;

mod scenario;
mod server;

pub use self::{scenario::ScenarioKind, server::ServerConfig};

/// Parse a human friendly duration such as `90s`, `1m 30s` or `1h_30m`.
pub fn parse_humantime_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    let s = s.trim();
    if s.contains('_') {
        humantime::parse_duration(&s.replace('_', " "))
    } else {
        humantime::parse_duration(s)
    }
}
