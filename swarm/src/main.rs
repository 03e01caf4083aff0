use std::{path::PathBuf, time::Duration};

use rama::{
    error::{BoxError, ErrorContext as _},
    graceful,
    telemetry::tracing,
};

use clap::{Parser, Subcommand};
use swarmload_lib::utils;

pub mod cmd;
pub mod config;

#[cfg(test)]
pub mod test;

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// CLI arguments for configuring swarmload behavior.
#[derive(Debug, Clone, Parser)]
#[command(name = "swarmload")]
#[command(bin_name = "swarmload")]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    cmds: CliCommands,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false, global = true)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false, global = true)]
    pub pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o', global = true)]
    pub output: Option<PathBuf>,

    /// directory in which data will be stored on the filesystem
    #[arg(long, default_value = ".swarmload", global = true)]
    pub data: PathBuf,

    #[arg(long, value_name = "SECONDS", default_value_t = 0., global = true)]
    /// the graceful shutdown timeout (<= 0.0 = no timeout)
    pub graceful: f64,
}

#[derive(Debug, Clone, Subcommand)]
enum CliCommands {
    Run(self::cmd::run::RunCommand),
    Mock(self::cmd::mock::MockCommand),
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    utils::telemetry::init_tracing(utils::telemetry::TelemetryConfig {
        verbose: args.verbose,
        pretty: args.pretty,
        output: args.output.as_deref(),
    })
    .context("init tracing")?;

    let base_shutdown_signal = graceful::default_signal();
    match run_with_args(base_shutdown_signal, args).await {
        Ok(0) => Ok(()),
        Ok(exit_code) => std::process::exit(exit_code),
        Err(err) => {
            eprintln!("🚩 exit with error: {err}");
            std::process::exit(1);
        }
    }
}

/// Run a swarmload cmd with the given args,
/// returning the exit code for the process.
///
/// This entry point is used by both the (binary) `main` function as well as
/// for the e2e test suite found in the test module.
async fn run_with_args<F>(base_shutdown_signal: F, args: Args) -> Result<i32, BoxError>
where
    F: Future<Output: Send + 'static> + Send + 'static,
{
    let graceful_timeout = if args.graceful > 0. {
        Some(
            Duration::try_from_secs_f64(args.graceful)
                .context("invalid graceful shutdown timeout")
                .context_field("graceful", args.graceful)?,
        )
    } else {
        None
    };

    let (result_tx, result_rx) = tokio::sync::oneshot::channel::<Result<i32, BoxError>>();
    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
    let graceful = graceful::Shutdown::new(new_shutdown_signal(done_rx, base_shutdown_signal));

    graceful.spawn_task_fn(async move |guard| {
        let result = match args.cmds {
            CliCommands::Run(run_args) => self::cmd::run::exec(guard, run_args).await,
            CliCommands::Mock(mock_args) => self::cmd::mock::exec(args.data, guard, mock_args)
                .await
                .map(|_| 0),
        };
        if let Err(err) = &result {
            tracing::error!("fatal err received: {err}; abort");
        }
        let _ = result_tx.send(result);
        drop(done_tx);
    });

    let delay = match graceful_timeout {
        Some(duration) => graceful.shutdown_with_limit(duration).await?,
        None => graceful.shutdown().await,
    };
    tracing::debug!("gracefully shutdown with a delay of: {delay:?}");

    result_rx
        .await
        .unwrap_or_else(|_| Err(BoxError::from("command aborted before it finished")))
}

fn new_shutdown_signal(
    done_rx: tokio::sync::oneshot::Receiver<()>,
    base_shutdown_signal: impl Future<Output: Send + 'static> + Send + 'static,
) -> impl Future + Send + 'static {
    async move {
        tokio::select! {
            _ = base_shutdown_signal => {
                tracing::debug!("default signal triggered: init graceful shutdown");
            }
            _ = done_rx => {
                tracing::debug!("command is finished, return control");
            }
        }
    }
}
