use std::{io::IsTerminal as _, path::Path};

use rama::{
    error::{BoxError, ErrorContext as _},
    telemetry::tracing::{
        self,
        metadata::LevelFilter,
        subscriber::{EnvFilter, fmt::writer::BoxMakeWriter},
    },
};

#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig<'a> {
    /// Use debug instead of info as the default level.
    pub verbose: bool,
    /// Format logs for humans.
    pub pretty: bool,
    /// Append logs to this file instead of writing them to stderr.
    pub output: Option<&'a Path>,
}

/// Install the global tracing subscriber of a swarmload process.
///
/// Logs go to stderr so they do not interleave with the load test report
/// on stdout, unless an output file is given. `RUST_LOG` directives take
/// precedence over the `verbose` default level.
pub fn init_tracing(cfg: TelemetryConfig<'_>) -> Result<(), BoxError> {
    let subscriber = tracing::subscriber::fmt()
        .with_ansi(cfg.output.is_none() && std::io::stderr().is_terminal())
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level(cfg.verbose).into())
                .from_env_lossy(),
        )
        .with_writer(make_writer(cfg.output)?);

    if cfg.pretty {
        subscriber.pretty().try_init()?;
    } else {
        subscriber.try_init()?;
    }

    tracing::debug!(verbose = cfg.verbose, output = ?cfg.output, "tracing initialized");
    Ok(())
}

fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}

fn make_writer(output: Option<&Path>) -> Result<BoxMakeWriter, BoxError> {
    let Some(path) = output else {
        return Ok(BoxMakeWriter::new(std::io::stderr));
    };

    let file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .context("open log file")
        .with_context_debug_field("path", || path.to_owned())?;
    Ok(BoxMakeWriter::new(file))
}
