use std::time::Duration;

use clap::Parser;

use crate::{Args, test::e2e};

#[tokio::test]
#[tracing_test::traced_test]
async fn test_run_cmd_until_run_time() {
    let runtime = e2e::runtime::get().await;
    let host = runtime.host().to_string();

    let args = Args::try_parse_from([
        "swarmload",
        "run",
        "--host",
        host.as_str(),
        "--scenario",
        "website-user",
        "-u",
        "2",
        "-r",
        "10",
        "-t",
        "1s",
        "--json",
    ])
    .unwrap();

    // the first think time of a website user is at least 5s,
    // so the run ends before any request could fail
    let exit_code = tokio::time::timeout(
        Duration::from_secs(10),
        crate::run_with_args(std::future::pending::<()>(), args),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(exit_code, 0);

    assert!(logs_contain("load test finished"));
}

#[test]
fn test_run_cmd_rejects_invalid_args() {
    for args in [
        vec!["swarmload", "run"],
        vec!["swarmload", "run", "--host", "localhost:8080"],
        vec!["swarmload", "run", "--host", "ftp://localhost"],
        vec!["swarmload", "run", "--host", "http://localhost", "--scenario", "about"],
        vec!["swarmload", "run", "--host", "http://localhost", "-t", "soon"],
        vec!["swarmload", "run", "--host", "http://localhost", "-u", "-1"],
    ] {
        assert!(Args::try_parse_from(args.iter().copied()).is_err(), "args: {args:?}");
    }
}

#[tokio::test]
async fn test_run_cmd_rejects_zero_users() {
    let args = Args::try_parse_from([
        "swarmload",
        "run",
        "--host",
        "http://127.0.0.1:1",
        "-u",
        "0",
        "-t",
        "1s",
    ])
    .unwrap();

    let result = crate::run_with_args(std::future::pending::<()>(), args).await;
    assert!(result.is_err());
}

#[test]
fn test_mock_cmd_args() {
    let args = Args::try_parse_from([
        "swarmload",
        "mock",
        "--base-latency",
        "0.05",
        "--jitter",
        "0.01",
        "--error-rate",
        "0.1",
    ])
    .unwrap();
    assert_eq!(args.data, std::path::PathBuf::from(".swarmload"));
}

#[tokio::test]
async fn test_invalid_graceful_timeout_is_an_error() {
    for graceful in ["inf", "1e300"] {
        let args = Args::try_parse_from([
            "swarmload",
            "run",
            "--host",
            "http://127.0.0.1:1",
            "-t",
            "1s",
            "--graceful",
            graceful,
        ])
        .unwrap();

        let result = crate::run_with_args(std::future::pending::<()>(), args).await;
        assert!(result.is_err(), "graceful: {graceful}");
    }
}
