use std::time::Duration;

use rama::{
    Service as _,
    graceful::Shutdown,
    http::{Body, BodyExtractExt as _, Method, Request, StatusCode},
};
use swarmload_lib::{
    client,
    runner::{self, RunConfig},
    scenario::{WaitTime, website_user},
};
use tokio::sync::mpsc;

use crate::{cmd::mock::HELLO_BODY, test::e2e};

#[tokio::test]
#[tracing_test::traced_test]
async fn test_website_users_only_request_hello() {
    let runtime = e2e::runtime::get().await;

    // same scenario, but with a think time that fits in a test
    let scenario = website_user()
        .unwrap()
        .with_wait_time(WaitTime::between(0.01, 0.05).unwrap());

    let cfg = RunConfig {
        users: 3,
        spawn_rate: 100.,
        run_time: Some(Duration::from_secs(1)),
        seed: Some(42),
        ..RunConfig::new(runtime.host())
    };

    let shutdown = Shutdown::default();
    let (tx, mut rx) = mpsc::channel(1024);
    let summary = runner::run(
        shutdown.guard(),
        scenario,
        client::new_web_client().unwrap(),
        cfg,
        tx,
    )
    .await
    .unwrap();
    assert_eq!(summary.users_spawned, 3);

    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }

    assert!(events.len() >= 3, "events: {}", events.len());
    for ev in events {
        assert_eq!(ev.method, Method::GET);
        assert_eq!(ev.path, "/hello");
        assert_eq!(ev.status, Some(200), "failure: {:?}", ev.failure);
        assert_eq!(ev.content_length, HELLO_BODY.len());
        assert!(ev.is_ok());
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_mock_host_has_no_about_page() {
    let runtime = e2e::runtime::get().await;
    let client = client::new_web_client().unwrap();

    let mut req = Request::new(Body::empty());
    *req.uri_mut() = runtime.host().join("/hello").unwrap();
    let resp = client.serve(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.try_into_string().await.unwrap(), HELLO_BODY);

    let mut req = Request::new(Body::empty());
    *req.uri_mut() = runtime.host().join("/about/").unwrap();
    let resp = client.serve(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
