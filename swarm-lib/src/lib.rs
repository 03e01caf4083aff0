#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

pub mod client;
pub mod runner;
pub mod scenario;
pub mod stats;
pub mod user;
pub mod utils;
