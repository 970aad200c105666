//! Tracing setup for the `synthplan` binary.
//!
//! `RUST_LOG` selects the filter (default `info`). With a log file, plain-text
//! events are appended to it; otherwise they go to stderr so stdout stays
//! reserved for the route output. Library code never installs a subscriber.

use std::path::Path;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if the log file cannot be opened or a subscriber is already set.
pub fn init(log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_filter(filter);
        tracing_subscriber::registry().with(file_layer).try_init()?;
        tracing::info!(path = %path.display(), "synthplan logging to file");
    } else {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter);
        tracing_subscriber::registry().with(stderr_layer).try_init()?;
    }
    Ok(())
}
