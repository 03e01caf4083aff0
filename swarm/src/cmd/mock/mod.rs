use std::{convert::Infallible, path::PathBuf, sync::Arc, time::Duration};

use rama::{
    Layer as _, Service,
    error::{BoxError, ErrorContext as _, ErrorExt as _},
    graceful::ShutdownGuard,
    http::{
        HeaderValue, Request, Response, StatusCode,
        layer::{required_header::AddRequiredResponseHeadersLayer, trace::TraceLayer},
        server::HttpServer,
        service::web::{Router, response::IntoResponse},
    },
    layer::TimeoutLayer,
    net::{address::SocketAddress, socket::Interface},
    rt::Executor,
    tcp::server::TcpListener,
    telemetry::tracing,
};

use clap::Args;
use swarmload_lib::utils;

use crate::config::ServerConfig;

#[derive(Debug, Clone, Args)]
/// run a local mock host serving the website user endpoints
pub struct MockCommand {
    #[clap(flatten)]
    config: Option<ServerConfig>,

    /// network interface to bind to
    #[arg(
        long,
        short = 'b',
        value_name = "INTERFACE",
        default_value = "127.0.0.1:0"
    )]
    pub bind: Interface,
}

pub async fn exec(data: PathBuf, guard: ShutdownGuard, args: MockCommand) -> Result<(), BoxError> {
    tokio::fs::create_dir_all(&data)
        .await
        .context("create data directory")
        .with_context_debug_field("path", || data.clone())?;

    let mock_svc = MockHttpServer::try_new(args.config.unwrap_or_default())?;
    tracing::info!(
        base_latency = mock_svc.base_latency,
        jitter = mock_svc.jitter,
        error_rate = mock_svc.error_rate,
        "mock server config ready",
    );

    let exec = Executor::graceful(guard);
    let tcp_listener = TcpListener::bind(args.bind, exec.clone())
        .await
        .context("bind mock http server")?;

    let http_svc = (
        TraceLayer::new_for_http(),
        AddRequiredResponseHeadersLayer::new()
            .with_server_header_value(HeaderValue::from_static(utils::env::server_identifier())),
    )
        .into_layer(mock_svc);

    let http_server = HttpServer::auto(exec).service(Arc::new(http_svc));
    let tcp_svc = TimeoutLayer::new(Duration::from_secs(60)).into_layer(http_server);

    let server_addr = tcp_listener
        .local_addr()
        .context("get bound address for mock http server")?;

    tracing::info!("mock http server bound to: {server_addr}");
    write_server_socket_address_as_file(&data, "mock", server_addr.into()).await?;

    tcp_listener.serve(tcp_svc).await;

    Ok(())
}

async fn write_server_socket_address_as_file(
    dir: &std::path::Path,
    name: &str,
    addr: SocketAddress,
) -> Result<(), BoxError> {
    let path = dir.join(format!("{name}.addr.txt"));
    tokio::fs::write(&path, addr.to_string())
        .await
        .context("write server's socket address to file")
        .context_field("address", addr)
        .with_context_debug_field("path", || path.to_owned())
}

/// Body returned by `GET /hello`.
pub const HELLO_BODY: &str = "Hello, World!";

/// Target host for load tests: `GET /hello` and `GET /ping`,
/// with configurable latency and failure rate.
///
/// Every other route results in a 404.
struct MockHttpServer {
    base_latency: f64,
    jitter: f64,
    error_rate: f32,
    router: Router,
}

impl MockHttpServer {
    fn try_new(cfg: ServerConfig) -> Result<Self, BoxError> {
        let base_latency = cfg.base_latency.unwrap_or_default();
        let jitter = cfg.jitter.unwrap_or_default();
        let error_rate = cfg.error_rate.unwrap_or_default();

        if !base_latency.is_finite() || base_latency < 0. {
            return Err(BoxError::from("base latency must be a positive number")
                .context_field("base_latency", base_latency));
        }
        if !jitter.is_finite() || jitter < 0. {
            return Err(
                BoxError::from("jitter must be a positive number").context_field("jitter", jitter)
            );
        }
        if !(0. ..=1.).contains(&error_rate) {
            return Err(BoxError::from("error_rate must be within [0.0, 1.0]")
                .context_field("error_rate", error_rate));
        }

        let router = Router::new()
            .with_get("/hello", HELLO_BODY)
            .with_get("/ping", "pong");

        Ok(Self {
            base_latency,
            jitter,
            error_rate,
            router,
        })
    }

    fn should_fail(&self) -> bool {
        self.error_rate > 0. && rand::random::<f32>() < self.error_rate
    }

    fn compute_delay(&self) -> Duration {
        if self.jitter == 0. {
            return Duration::from_secs_f64(self.base_latency);
        }

        let span = self.jitter * 2.;
        let u: f64 = rand::random();
        let delta = (u * span) - self.jitter;

        Duration::from_secs_f64((self.base_latency + delta).max(0.))
    }
}

impl Service<Request> for MockHttpServer {
    type Output = Response;
    type Error = Infallible;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        let delay = self.compute_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail() {
            return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
        }

        self.router.serve(req).await
    }
}
