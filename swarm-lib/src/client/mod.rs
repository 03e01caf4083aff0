//! centralized (web) client creation
//!
//! All simulated users share the client created here.
//! Unit tests hand an in-process mock client to the runner instead,
//! so the test suite never makes actual network requests.

use rama::{
    error::BoxError,
    http::{Request, Response},
    service::BoxService,
};

#[cfg(not(test))]
use rama::{
    Layer as _, Service as _,
    error::ErrorContext as _,
    http::client::EasyHttpWebClient,
    layer::MapErrLayer,
    rt::Executor,
};

mod target;

pub use self::target::TargetHost;

#[cfg(test)]
pub(crate) mod mock_client;

/// Client handed to the actions of every simulated user.
pub type HttpClient = BoxService<Request, Response, BoxError>;

/// Create a new web client that can be cloned and shared.
#[cfg(not(test))]
pub fn new_web_client() -> Result<HttpClient, BoxError> {
    let inner = EasyHttpWebClient::connector_builder()
        .with_default_transport_connector()
        .without_tls_proxy_support()
        .without_proxy_support()
        .with_tls_support_using_boringssl(None)
        .with_default_http_connector(Executor::default())
        .try_with_default_connection_pool()
        .context("create connection pool for load test web client")?
        .build_client();

    Ok(MapErrLayer::new(BoxError::from).into_layer(inner).boxed())
}
