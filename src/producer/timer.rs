//! Timer producer.
//!
//! A start step and a stop step configured with the same metric name bracket
//! a segment of the pipeline. The measurement in progress lives in the
//! exchange's property bag under `<namespace>:<metric name>`, so:
//! - no handle under the key: idle
//! - a handle under the key: running
//!
//! Timings on different metric names within one exchange use different keys
//! and never interfere. Separate exchanges have separate property bags.

use std::sync::Arc;

use crate::endpoint::{TimerAction, TimerPolicy, DEFAULT_NAMESPACE};
use crate::error::MetricsError;
use crate::exchange::Exchange;
use crate::name::resolve_metric_name;
use crate::producer::Producer;
use crate::registry::{MetricKind, MetricRegistry, TimerContext, TimerExt};

/// Starts or stops a duration measurement on each exchange.
pub struct TimerProducer {
    registry: Arc<dyn MetricRegistry>,
    name: String,
    action: Option<TimerAction>,
    namespace: String,
    policy: TimerPolicy,
}

impl TimerProducer {
    /// Create a lenient producer in the default namespace.
    ///
    /// An `action` of `None` makes every call to `process` a no-op.
    pub fn new(
        registry: Arc<dyn MetricRegistry>,
        name: impl Into<String>,
        action: Option<TimerAction>,
    ) -> Self {
        Self {
            registry,
            name: name.into(),
            action,
            namespace: DEFAULT_NAMESPACE.to_string(),
            policy: TimerPolicy::default(),
        }
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

    /// Property key holding the running measurement for `metric_name`.
    pub fn correlation_key(&self, metric_name: &str) -> String {
        format!("{}:{}", self.namespace, metric_name)
    }

    /// The measurement in progress for `metric_name`, if any.
    pub fn running_timer<'a>(
        &self,
        exchange: &'a Exchange,
        metric_name: &str,
    ) -> Result<Option<&'a TimerContext>, MetricsError> {
        exchange.property::<TimerContext>(&self.correlation_key(metric_name))
    }

    /// Begin measuring `metric_name` unless a measurement is already running.
    pub fn handle_start(
        &self,
        exchange: &mut Exchange,
        registry: &dyn MetricRegistry,
        metric_name: &str,
    ) -> Result<(), MetricsError> {
        let key = self.correlation_key(metric_name);

        if exchange.property::<TimerContext>(&key)?.is_some() {
            if self.policy == TimerPolicy::Strict {
                return Err(MetricsError::TimerAlreadyRunning(key));
            }
            tracing::debug!(
                exchange_id = exchange.id(),
                key = %key,
                "Timer already running, start ignored"
            );
            return Ok(());
        }

        let context = registry.timer(metric_name)?.time();
        exchange.set_property(key, context);
        tracing::trace!(exchange_id = exchange.id(), metric = metric_name, "Timer started");
        Ok(())
    }

    /// Stop the running measurement for `metric_name` and record it.
    ///
    /// The handle already references its timer, so no registry lookup
    /// happens here.
    pub fn handle_stop(
        &self,
        exchange: &mut Exchange,
        metric_name: &str,
    ) -> Result<(), MetricsError> {
        let key = self.correlation_key(metric_name);

        match exchange.take_property::<TimerContext>(&key)? {
            Some(context) => {
                let elapsed = context.stop();
                tracing::debug!(
                    exchange_id = exchange.id(),
                    metric = metric_name,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "Timer stopped"
                );
                Ok(())
            }
            None if self.policy == TimerPolicy::Strict => {
                Err(MetricsError::TimerNotRunning(key))
            }
            None => {
                tracing::debug!(
                    exchange_id = exchange.id(),
                    key = %key,
                    "No running timer, stop ignored"
                );
                Ok(())
            }
        }
    }
}

impl Producer for TimerProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Timer
    }

    fn process(&self, exchange: &mut Exchange) -> Result<(), MetricsError> {
        let metric_name = resolve_metric_name(&self.name, exchange);
        match self.action {
            Some(TimerAction::Start) => {
                self.handle_start(exchange, self.registry.as_ref(), &metric_name)
            }
            Some(TimerAction::Stop) => self.handle_stop(exchange, &metric_name),
            None => {
                tracing::trace!(
                    exchange_id = exchange.id(),
                    metric = %metric_name,
                    "Timer step has no action"
                );
                Ok(())
            }
        }
    }
}
