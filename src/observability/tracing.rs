//! Tracing subscriber setup.
//!
//! Configures structured logging with:
//! - `RUST_LOG` filter, falling back to the configured level
//! - Human-readable or JSON output

use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

/// Build the filter: `RUST_LOG` if set, else `log_level` for this crate and
/// `warn` for everything else.
fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,tally={log_level}")))
}

/// Initialize tracing.
///
/// # Arguments
///
/// * `log_level` - Level for this crate's events when `RUST_LOG` is unset
/// * `format` - Output format
///
/// # Panics
///
/// Panics if tracing has already been initialized.
pub fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = build_filter(log_level);
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_thread_ids(true),
            )
            .init(),
    }

    tracing::debug!(level = log_level, ?format, "Tracing initialized");
}

/// Initialize tracing for tests (only logs errors).
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("error")
        .with_test_writer()
        .try_init();
}
