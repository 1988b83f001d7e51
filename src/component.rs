//! Wiring: registry bindings and producer construction.
//!
//! The registry is a required dependency. It is resolved once, when the
//! component is created, so a missing binding fails pipeline setup rather
//! than the first exchange.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::endpoint::EndpointConfig;
use crate::error::MetricsError;
use crate::producer::{CounterProducer, HistogramProducer, MeterProducer, Producer, TimerProducer};
use crate::registry::{MetricKind, MetricRegistry};

/// Binding name under which the component looks up its registry.
pub const METRIC_REGISTRY_NAME: &str = "metricRegistry";

/// Named, shared registries available to the pipeline.
#[derive(Clone, Default)]
pub struct RegistryBindings {
    registries: HashMap<String, Arc<dyn MetricRegistry>>,
}

impl RegistryBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `registry` under `name`, replacing any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, registry: Arc<dyn MetricRegistry>) {
        self.registries.insert(name.into(), registry);
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, registry: Arc<dyn MetricRegistry>) -> Self {
        self.bind(name, registry);
        self
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn MetricRegistry>, MetricsError> {
        self.registries
            .get(name)
            .cloned()
            .ok_or_else(|| MetricsError::MissingRegistry(name.to_string()))
    }
}

impl fmt::Debug for RegistryBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.registries.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("RegistryBindings")
            .field("names", &names)
            .finish()
    }
}

/// Creates metrics producers bound to one registry.
#[derive(Clone)]
pub struct MetricsComponent {
    registry: Arc<dyn MetricRegistry>,
}

impl MetricsComponent {
    /// Resolve the registry bound under [`METRIC_REGISTRY_NAME`].
    pub fn new(bindings: &RegistryBindings) -> Result<Self, MetricsError> {
        Self::from_binding(bindings, METRIC_REGISTRY_NAME)
    }

    /// Resolve the registry bound under `name`.
    pub fn from_binding(bindings: &RegistryBindings, name: &str) -> Result<Self, MetricsError> {
        let registry = bindings.lookup(name).inspect_err(|e| {
            tracing::error!(error = %e, "Metrics component cannot be wired");
        })?;
        Ok(Self::with_registry(registry))
    }

    pub fn with_registry(registry: Arc<dyn MetricRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<dyn MetricRegistry> {
        &self.registry
    }

    /// Validate `config` and build the matching producer.
    pub fn create_producer(
        &self,
        config: &EndpointConfig,
    ) -> Result<Box<dyn Producer>, MetricsError> {
        config.validate()?;
        let registry = Arc::clone(&self.registry);
        let name = config.name.clone();

        let producer: Box<dyn Producer> = match config.metric_type {
            MetricKind::Timer => Box::new(
                TimerProducer::new(registry, name, config.action)
                    .with_namespace(config.namespace.clone())
                    .with_policy(config.policy),
            ),
            MetricKind::Counter => Box::new(
                CounterProducer::new(registry, name)
                    .with_increment(config.increment)
                    .with_decrement(config.decrement),
            ),
            MetricKind::Histogram => Box::new(HistogramProducer::new(registry, name, config.value)),
            MetricKind::Meter => Box::new(MeterProducer::new(registry, name).with_mark(config.mark)),
        };

        tracing::debug!(
            kind = %config.metric_type,
            name = %config.name,
            "Created metrics producer"
        );
        Ok(producer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::TimerAction;
    use crate::exchange::Exchange;
    use crate::registry::InMemoryRegistry;

    fn component() -> (Arc<InMemoryRegistry>, MetricsComponent) {
        let registry = Arc::new(InMemoryRegistry::new());
        let bindings = RegistryBindings::new().with(METRIC_REGISTRY_NAME, registry.clone());
        (registry, MetricsComponent::new(&bindings).unwrap())
    }

    #[test]
    fn test_missing_registry_fails_at_wiring() {
        let err = MetricsComponent::new(&RegistryBindings::new()).err().unwrap();
        assert!(matches!(err, MetricsError::MissingRegistry(ref name) if name == "metricRegistry"));
    }

    #[test]
    fn test_custom_binding_name() {
        let registry: Arc<dyn MetricRegistry> = Arc::new(InMemoryRegistry::new());
        let bindings = RegistryBindings::new().with("routes", registry);

        assert!(MetricsComponent::from_binding(&bindings, "routes").is_ok());
        assert!(MetricsComponent::new(&bindings).is_err());
    }

    #[test]
    fn test_bindings_debug_lists_names() {
        let bindings = RegistryBindings::new()
            .with("b", Arc::new(InMemoryRegistry::new()))
            .with("a", Arc::new(InMemoryRegistry::new()));
        assert_eq!(
            format!("{:?}", bindings),
            r#"RegistryBindings { names: ["a", "b"] }"#
        );
    }

    #[test]
    fn test_create_producer_for_each_kind() {
        let (_, component) = component();
        let configs = [
            EndpointConfig::timer("t", Some(TimerAction::Start)),
            EndpointConfig::counter("c"),
            EndpointConfig::histogram("h", Some(1)),
            EndpointConfig::meter("m"),
        ];

        for config in &configs {
            let producer = component.create_producer(config).unwrap();
            assert_eq!(producer.kind(), config.metric_type);
            assert_eq!(producer.name(), config.name);
        }
    }

    #[test]
    fn test_create_producer_rejects_invalid_config() {
        let (_, component) = component();
        let err = component
            .create_producer(&EndpointConfig::timer("two words", None))
            .err()
            .unwrap();
        assert!(matches!(err, MetricsError::Config(_)));
    }

    #[test]
    fn test_created_producers_share_registry() {
        let (registry, component) = component();
        let start = component
            .create_producer(&EndpointConfig::timer("A", Some(TimerAction::Start)))
            .unwrap();
        let stop = component
            .create_producer(&EndpointConfig::timer("A", Some(TimerAction::Stop)))
            .unwrap();
        let mut exchange = Exchange::new();

        start.process(&mut exchange).unwrap();
        stop.process(&mut exchange).unwrap();

        assert_eq!(registry.snapshot().timers["A"].count, 1);
    }

    #[test]
    fn test_timer_namespace_from_config() {
        let (_, component) = component();
        let start = component
            .create_producer(
                &EndpointConfig::timer("A", Some(TimerAction::Start)).with_namespace("route-7"),
            )
            .unwrap();
        let mut exchange = Exchange::new();

        start.process(&mut exchange).unwrap();

        assert!(exchange.has_property("route-7:A"));
    }
}
