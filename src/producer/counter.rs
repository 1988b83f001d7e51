//! Counter producer.

use std::sync::Arc;

use super::{header_value, Producer};
use crate::error::MetricsError;
use crate::exchange::Exchange;
use crate::headers;
use crate::name::resolve_metric_name;
use crate::registry::{MetricKind, MetricRegistry};

/// Increments or decrements a counter once per exchange.
///
/// An increment wins over a decrement; with neither configured the counter
/// is incremented by one. If either override header is present the headers
/// replace the configured amounts entirely.
///
/// A decrement of `i64::MIN` has no negation and is rejected before the
/// registry is touched.
pub struct CounterProducer {
    registry: Arc<dyn MetricRegistry>,
    name: String,
    increment: Option<i64>,
    decrement: Option<i64>,
}

impl CounterProducer {
    pub fn new(registry: Arc<dyn MetricRegistry>, name: impl Into<String>) -> Self {
        Self {
            registry,
            name: name.into(),
            increment: None,
            decrement: None,
        }
    }

    #[must_use]
    pub fn with_increment(mut self, increment: Option<i64>) -> Self {
        self.increment = increment;
        self
    }

    #[must_use]
    pub fn with_decrement(mut self, decrement: Option<i64>) -> Self {
        self.decrement = decrement;
        self
    }
}

impl Producer for CounterProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Counter
    }

    fn process(&self, exchange: &mut Exchange) -> Result<(), MetricsError> {
        let metric_name = resolve_metric_name(&self.name, exchange);
        let header_inc = header_value::<i64>(exchange, headers::COUNTER_INCREMENT)?;
        let header_dec = header_value::<i64>(exchange, headers::COUNTER_DECREMENT)?;
        let from_headers = header_inc.is_some() || header_dec.is_some();
        let (increment, decrement) = if from_headers {
            (header_inc, header_dec)
        } else {
            (self.increment, self.decrement)
        };

        if increment.is_none() && decrement == Some(i64::MIN) {
            return Err(if from_headers {
                MetricsError::InvalidHeader {
                    header: headers::COUNTER_DECREMENT,
                    value: i64::MIN.to_string(),
                }
            } else {
                MetricsError::Config(format!("decrement {} is out of range", i64::MIN))
            });
        }

        let counter = self.registry.counter(&metric_name)?;
        match (increment, decrement) {
            (Some(n), _) => counter.inc(n),
            (None, Some(n)) => counter.dec(n),
            (None, None) => counter.inc(1),
        }
        tracing::trace!(exchange_id = exchange.id(), metric = %metric_name, "Counter updated");
        Ok(())
    }
}
