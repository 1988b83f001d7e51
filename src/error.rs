//! Error types for metrics producers and registries.

use thiserror::Error;

use crate::registry::MetricKind;

/// Error type for registry lookups.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("metric '{name}' is registered as a {registered}, not a {requested}")]
    TypeConflict {
        name: String,
        registered: MetricKind,
        requested: MetricKind,
    },
}

/// Error type for producer setup and message processing.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid endpoint configuration: {0}")]
    Config(String),

    #[error("no metric registry bound under '{0}'")]
    MissingRegistry(String),

    #[error("exchange property '{key}' does not hold a {expected}")]
    PropertyTypeMismatch { key: String, expected: &'static str },

    #[error("header '{header}' has invalid value '{value}'")]
    InvalidHeader { header: &'static str, value: String },

    #[error("timer '{0}' is already running")]
    TimerAlreadyRunning(String),

    #[error("timer '{0}' is not running")]
    TimerNotRunning(String),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_conflict_display() {
        let err = RegistryError::TypeConflict {
            name: "orders".into(),
            registered: MetricKind::Counter,
            requested: MetricKind::Timer,
        };
        assert_eq!(
            err.to_string(),
            "metric 'orders' is registered as a counter, not a timer"
        );
    }

    #[test]
    fn test_registry_error_converts() {
        let err: MetricsError = RegistryError::TypeConflict {
            name: "a".into(),
            registered: MetricKind::Meter,
            requested: MetricKind::Histogram,
        }
        .into();
        assert!(matches!(err, MetricsError::Registry(_)));
    }

    #[test]
    fn test_errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MetricsError>();
        assert_send_sync::<RegistryError>();
    }
}
