use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::{Arc, LazyLock, OnceLock},
    time::Duration,
};

use clap::Parser;
use rama::net::address::SocketAddress;
use swarmload_lib::client::TargetHost;

use crate::Args;

#[derive(Clone)]
pub(super) struct Runtime {
    _app: App,

    mock_addr: SocketAddress,
}

impl Runtime {
    #[inline(always)]
    pub fn mock_addr(&self) -> SocketAddress {
        self.mock_addr
    }

    /// Target host pointing to the mock server.
    pub fn host(&self) -> TargetHost {
        format!("http://{}", self.mock_addr).parse().unwrap()
    }
}

#[derive(Clone)]
struct App {
    data_dir: PathBuf,
}

pub(super) async fn get() -> Runtime {
    static APP: LazyLock<App> = LazyLock::new(App::new);

    let app = APP.clone();

    let mock_addr = tokio::time::timeout(
        Duration::from_secs(30),
        read_file_or_wait(app.data_dir.join("mock.addr.txt")),
    )
    .await
    .unwrap();

    let runtime = Runtime {
        _app: app,
        mock_addr,
    };

    assert!(runtime.mock_addr().ip_addr.is_loopback());

    runtime
}

async fn read_file_or_wait(path: PathBuf) -> SocketAddress {
    loop {
        match tokio::fs::read_to_string(&path).await {
            Ok(s) if !s.is_empty() => return s.parse().unwrap(),
            Ok(_) => tokio::time::sleep(Duration::from_millis(50)).await,
            Err(err) => {
                if err.kind() == ErrorKind::NotFound {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    continue;
                } else {
                    panic!("unexpected error: {err}");
                }
            }
        }
    }
}

impl App {
    fn new() -> Self {
        let data_dir = spawn_swarmload_mock_app();
        Self { data_dir }
    }
}

fn spawn_swarmload_mock_app() -> PathBuf {
    let data_dir = std::env::temp_dir().join(format!(
        "swarmload_mock_app_e2e_{}",
        std::process::id()
    ));
    eprintln!("swarmload_mock_app_e2e all data stored under: {data_dir:?}");

    let data_dir_str = data_dir.display().to_string();

    let args = Args::try_parse_from([
        "swarmload",
        "mock",
        "--bind",
        "127.0.0.1:0",
        "--data",
        data_dir_str.as_str(),
        "--graceful",
        "0.42",
    ])
    .unwrap();

    let wait_server_ready = Arc::new(OnceLock::new());
    let notify_server_ready = wait_server_ready.clone();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let server_future = crate::run_with_args(std::future::pending::<()>(), args);

        notify_server_ready.set(()).expect("waiter to be nofified");

        rt.block_on(server_future).expect("serve without errors");
    });

    wait_server_ready.wait();

    data_dir
}
