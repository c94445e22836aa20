//! Tracing subscriber setup shared by the binary and tests.
//!
//! stdout carries the transcript, so diagnostics never go to the terminal;
//! they are written to the per-process log file instead.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber writing to `log_file_path`.
///
/// Does nothing if a global subscriber is already set.
pub fn init_global(log_file_path: &Path) -> io::Result<()> {
    let log_file = File::create(log_file_path)?;
    if build_subscriber(log_file).try_init().is_err() {
        tracing::debug!("Global tracing subscriber already installed");
    }
    Ok(())
}

/// File logging filtered by `RUST_LOG`, DEBUG when unset.
pub fn build_subscriber(log_file: File) -> impl tracing::Subscriber + Send + Sync {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug,mio=info"));

    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
}
