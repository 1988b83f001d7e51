//! Metric name resolution and validation.

use crate::error::MetricsError;
use crate::exchange::Exchange;
use crate::headers;

/// Effective metric name for one exchange.
///
/// A non-empty [`headers::METRIC_NAME`] header wins over the configured name.
pub fn resolve_metric_name(static_name: &str, exchange: &Exchange) -> String {
    match exchange.header(headers::METRIC_NAME) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => static_name.to_string(),
    }
}

/// Check a statically configured metric name.
///
/// Names must be non-empty and free of whitespace and control characters.
pub fn validate_metric_name(name: &str) -> Result<(), MetricsError> {
    if name.trim().is_empty() {
        return Err(MetricsError::Config("metric name cannot be empty".into()));
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(MetricsError::Config(format!(
            "metric name '{}' must not contain whitespace or control characters",
            name.escape_debug()
        )));
    }
    Ok(())
}
