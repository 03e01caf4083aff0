use std::sync::Arc;

use parking_lot::Mutex;
use rama::{
    Service as _,
    error::BoxError,
    http::{Method, Request, Response, StatusCode, service::web::response::IntoResponse},
    service::service_fn,
};
use tokio::time::Instant;

use super::HttpClient;

#[derive(Debug, Clone)]
pub(crate) struct LoggedRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) at: Instant,
}

/// Requests seen by a mock client, in the order they were served.
#[derive(Debug, Clone, Default)]
pub(crate) struct RequestLog(Arc<Mutex<Vec<LoggedRequest>>>);

impl RequestLog {
    pub(crate) fn entries(&self) -> Vec<LoggedRequest> {
        self.0.lock().clone()
    }

    pub(crate) fn paths(&self) -> Vec<String> {
        self.0.lock().iter().map(|req| req.path.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.0.lock().len()
    }

    fn push(&self, req: &Request) {
        self.0.lock().push(LoggedRequest {
            method: req.method().clone(),
            path: req.uri().path().to_owned(),
            at: Instant::now(),
        });
    }
}

/// Mock (web) client which answers every request with the given status.
///
/// Returns the client together with the log of requests it served.
pub(crate) fn new_mock_client(status: StatusCode) -> (HttpClient, RequestLog) {
    let log = RequestLog::default();
    let client = service_fn({
        let log = log.clone();
        move |req: Request| {
            log.push(&req);
            std::future::ready(Ok::<Response, BoxError>(status.into_response()))
        }
    })
    .boxed();
    (client, log)
}

/// Mock (web) client which fails every request on the transport level.
pub(crate) fn new_failing_mock_client(message: &'static str) -> (HttpClient, RequestLog) {
    let log = RequestLog::default();
    let client = service_fn({
        let log = log.clone();
        move |req: Request| {
            log.push(&req);
            std::future::ready(Err::<Response, BoxError>(BoxError::from(message)))
        }
    })
    .boxed();
    (client, log)
}

/// Mock (web) client which never answers.
pub(crate) fn new_stalling_mock_client() -> (HttpClient, RequestLog) {
    let log = RequestLog::default();
    let client = service_fn({
        let log = log.clone();
        move |req: Request| {
            log.push(&req);
            std::future::pending::<Result<Response, BoxError>>()
        }
    })
    .boxed();
    (client, log)
}
