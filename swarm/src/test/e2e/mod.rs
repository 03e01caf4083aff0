#![allow(unused)]

mod runtime;

mod test_cli;
mod test_website_user;

#[tokio::test]
#[tracing_test::traced_test]
async fn test_runtime_get() {
    // simple test to ensure that creating and getting runtime works,
    // outside out of any other things that might otherwise go wrong

    let runtime = self::runtime::get().await;
    assert!(runtime.mock_addr().ip_addr.is_loopback());
    assert_eq!(
        runtime.host().to_string(),
        format!("http://{}", runtime.mock_addr())
    );
}
