// Tracing setup shared by the TUI and the server

use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Default filter while the terminal UI owns the screen: anything written
/// to stderr would land on top of the alternate screen.
pub const TUI_DEFAULT_FILTER: &str = "off";

/// Default filter for the server and one-shot commands
pub const DEFAULT_FILTER: &str = "info";

/// Resolve the filter: `explicit` (from `--log-level` / `ECOSPEND_LOG`),
/// then `RUST_LOG`, then `default`.
pub fn filter(explicit: Option<&str>, default: &str) -> Result<EnvFilter> {
    let filter = match explicit {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?,
    };
    Ok(filter)
}

/// Install the global fmt subscriber.
///
/// Events go to `log_file` (appended, no ANSI colours) when given,
/// otherwise to stderr.
pub fn init(explicit: Option<&str>, default: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = filter(explicit, default)?;

    let writer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
