//! Static configuration of a metrics step.
//!
//! An [`EndpointConfig`] is bound once when the pipeline is wired and never
//! changes afterwards; per-message variation comes only from headers (see
//! [`crate::headers`]). Configs deserialize from JSON:
//!
//! ```
//! let config = tally::EndpointConfig::from_json(
//!     r#"{"type": "timer", "name": "orders.latency", "action": "start"}"#,
//! )
//! .unwrap();
//! assert_eq!(config.action, Some(tally::TimerAction::Start));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MetricsError;
use crate::name::validate_metric_name;
use crate::registry::MetricKind;

/// Namespace prefix for timer correlation keys.
pub const DEFAULT_NAMESPACE: &str = "tally:timer";

/// What a timer step does to the exchange's measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerAction {
    Start,
    Stop,
}

impl FromStr for TimerAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            _ => Err(format!("unknown timer action: {}", s)),
        }
    }
}

impl fmt::Display for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Stop => "stop",
        })
    }
}

/// How a timer step treats a start on a running timer or a stop on an idle
/// one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPolicy {
    /// Both are no-ops.
    #[default]
    Lenient,
    /// Both are errors; the exchange is left unchanged.
    Strict,
}

impl FromStr for TimerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            _ => Err(format!("unknown timer policy: {}", s)),
        }
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// Configuration of a single metrics step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// Kind of metric this step records
    #[serde(rename = "type")]
    pub metric_type: MetricKind,

    /// Default metric name
    pub name: String,

    /// Timer action; `None` disables the step
    #[serde(default)]
    pub action: Option<TimerAction>,

    /// Timer correlation key namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Timer start/stop policy
    #[serde(default)]
    pub policy: TimerPolicy,

    /// Counter increment
    #[serde(default)]
    pub increment: Option<i64>,

    /// Counter decrement, used when no increment is set
    #[serde(default)]
    pub decrement: Option<i64>,

    /// Histogram value
    #[serde(default)]
    pub value: Option<i64>,

    /// Meter mark, defaults to 1
    #[serde(default)]
    pub mark: Option<u64>,
}

impl EndpointConfig {
    fn new(metric_type: MetricKind, name: impl Into<String>) -> Self {
        Self {
            metric_type,
            name: name.into(),
            action: None,
            namespace: default_namespace(),
            policy: TimerPolicy::default(),
            increment: None,
            decrement: None,
            value: None,
            mark: None,
        }
    }

    pub fn timer(name: impl Into<String>, action: Option<TimerAction>) -> Self {
        Self {
            action,
            ..Self::new(MetricKind::Timer, name)
        }
    }

    pub fn counter(name: impl Into<String>) -> Self {
        Self::new(MetricKind::Counter, name)
    }

    pub fn histogram(name: impl Into<String>, value: Option<i64>) -> Self {
        Self {
            value,
            ..Self::new(MetricKind::Histogram, name)
        }
    }

    pub fn meter(name: impl Into<String>) -> Self {
        Self::new(MetricKind::Meter, name)
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: TimerPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_increment(mut self, increment: i64) -> Self {
        self.increment = Some(increment);
        self
    }

    #[must_use]
    pub fn with_decrement(mut self, decrement: i64) -> Self {
        self.decrement = Some(decrement);
        self
    }

    #[must_use]
    pub fn with_mark(mut self, mark: u64) -> Self {
        self.mark = Some(mark);
        self
    }

    /// Parse a config from JSON. The result is not yet validated.
    pub fn from_json(json: &str) -> Result<Self, MetricsError> {
        serde_json::from_str(json).map_err(|e| MetricsError::Config(e.to_string()))
    }

    /// Reject malformed names and options that do not apply to the metric type.
    pub fn validate(&self) -> Result<(), MetricsError> {
        validate_metric_name(&self.name)?;

        let kind = self.metric_type;
        let misplaced = |option: &str, applies_to: MetricKind| {
            MetricsError::Config(format!(
                "'{option}' only applies to {applies_to} endpoints, not {kind}"
            ))
        };

        if kind != MetricKind::Timer {
            if self.action.is_some() {
                return Err(misplaced("action", MetricKind::Timer));
            }
        } else if self.namespace.trim().is_empty() {
            return Err(MetricsError::Config(
                "timer namespace cannot be empty".into(),
            ));
        }
        if kind != MetricKind::Counter && (self.increment.is_some() || self.decrement.is_some()) {
            return Err(misplaced("increment/decrement", MetricKind::Counter));
        }
        if self.decrement == Some(i64::MIN) {
            return Err(MetricsError::Config(format!(
                "decrement {} is out of range",
                i64::MIN
            )));
        }
        if kind != MetricKind::Histogram && self.value.is_some() {
            return Err(misplaced("value", MetricKind::Histogram));
        }
        if kind != MetricKind::Meter && self.mark.is_some() {
            return Err(misplaced("mark", MetricKind::Meter));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_action_from_str() {
        assert_eq!("start".parse::<TimerAction>(), Ok(TimerAction::Start));
        assert_eq!("STOP".parse::<TimerAction>(), Ok(TimerAction::Stop));
        assert!("pause".parse::<TimerAction>().is_err());
    }

    #[test]
    fn test_policy_defaults_to_lenient() {
        assert_eq!(TimerPolicy::default(), TimerPolicy::Lenient);
        assert_eq!("strict".parse::<TimerPolicy>(), Ok(TimerPolicy::Strict));
    }

    #[test]
    fn test_from_json_defaults() {
        let config = EndpointConfig::from_json(r#"{"type": "timer", "name": "A"}"#).unwrap();
        assert_eq!(config.metric_type, MetricKind::Timer);
        assert_eq!(config.action, None);
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.policy, TimerPolicy::Lenient);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_full_timer() {
        let config = EndpointConfig::from_json(
            r#"{"type": "timer", "name": "A", "action": "stop",
                "namespace": "route-1", "policy": "strict"}"#,
        )
        .unwrap();
        assert_eq!(
            config,
            EndpointConfig::timer("A", Some(TimerAction::Stop))
                .with_namespace("route-1")
                .with_policy(TimerPolicy::Strict)
        );
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let err = EndpointConfig::from_json(r#"{"type": "meter", "name": "A", "rate": 3}"#)
            .unwrap_err();
        assert!(matches!(err, MetricsError::Config(_)));
    }

    #[test]
    fn test_from_json_rejects_unknown_action() {
        assert!(
            EndpointConfig::from_json(r#"{"type": "timer", "name": "A", "action": "pause"}"#)
                .is_err()
        );
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        assert!(EndpointConfig::counter("").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_misplaced_options() {
        let mut config = EndpointConfig::counter("A");
        config.action = Some(TimerAction::Start);
        assert!(config.validate().is_err());

        assert!(EndpointConfig::timer("A", None)
            .with_increment(1)
            .validate()
            .is_err());
        assert!(EndpointConfig::meter("A").with_decrement(1).validate().is_err());

        let mut config = EndpointConfig::meter("A");
        config.value = Some(3);
        assert!(config.validate().is_err());

        assert!(EndpointConfig::histogram("A", Some(1))
            .with_mark(2)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_rejects_empty_namespace() {
        assert!(EndpointConfig::timer("A", Some(TimerAction::Start))
            .with_namespace(" ")
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_accepts_applicable_options() {
        assert!(EndpointConfig::counter("A")
            .with_increment(5)
            .validate()
            .is_ok());
        assert!(EndpointConfig::histogram("A", Some(7)).validate().is_ok());
        assert!(EndpointConfig::meter("A").with_mark(3).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unnegatable_decrement() {
        let err = EndpointConfig::counter("A")
            .with_decrement(i64::MIN)
            .validate()
            .unwrap_err();
        assert!(matches!(err, MetricsError::Config(_)));
        assert!(EndpointConfig::counter("A")
            .with_decrement(i64::MAX)
            .validate()
            .is_ok());
    }
}
