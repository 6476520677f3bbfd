//! Tracing configuration and log routing.
//!
//! The server logs to stdout using a compact formatter; the CLI logs to stderr so the summary
//! on stdout stays clean. Both also write to a file: `PAPERSUM_LOG_FILE` when set, otherwise
//! `logs/papersum.log`. A non‑blocking writer keeps file I/O off the request path.
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, fmt::MakeWriter, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configure tracing for the HTTP server: stdout plus file, `RUST_LOG` defaulting to `info`.
pub fn init_tracing() {
    install(std::io::stdout, "info");
}

/// Configure tracing for the CLI: stderr plus file, `RUST_LOG` defaulting to `warn`.
pub fn init_cli_tracing() {
    install(std::io::stderr, "warn");
}

fn install<W>(console: W, default_filter: &str)
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let console_layer = fmt::layer()
        .with_writer(console)
        .with_target(false)
        .compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if let Some(writer) = configure_file_writer() {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Build a non‑blocking writer for file logging.
///
/// Returns `None` when the logs directory cannot be created or the target file cannot be opened.
fn configure_file_writer() -> Option<NonBlocking> {
    if let Ok(path) = std::env::var("PAPERSUM_LOG_FILE") {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                let _ = LOG_GUARD.set(guard);
                Some(non_blocking)
            }
            Err(err) => {
                eprintln!("Failed to open log file {path}: {err}");
                None
            }
        }
    } else {
        if let Err(err) = std::fs::create_dir_all("logs") {
            eprintln!("Failed to create logs directory: {err}");
            return None;
        }
        let file_appender = tracing_appender::rolling::never("logs", "papersum.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);
        Some(non_blocking)
    }
}
