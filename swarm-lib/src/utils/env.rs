pub const fn server_identifier() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))
}

/// Upper bound for the result channel capacity,
/// well below the limit of tokio's bounded channels.
pub const MAX_RESULT_CHANNEL_CAPACITY: usize = 1 << 20;

/// Capacity of the channel between the simulated users and the stats sink.
///
/// Can be overwritten using the `MAX_CONCURRENT_REQUESTS` env variable.
pub fn compute_result_channel_capacity(users: usize) -> usize {
    let overwrite = std::env::var("MAX_CONCURRENT_REQUESTS")
        .ok()
        .and_then(|v| v.parse().ok());
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    result_channel_capacity(users, overwrite, cpus)
}

fn result_channel_capacity(users: usize, overwrite: Option<usize>, cpus: usize) -> usize {
    overwrite
        .filter(|n| *n > 0)
        .unwrap_or_else(|| users.saturating_mul(8).max(cpus.saturating_mul(64)))
        .min(MAX_RESULT_CHANNEL_CAPACITY)
}
