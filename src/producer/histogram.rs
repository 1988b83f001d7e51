//! Histogram producer.

use std::sync::Arc;

use super::{header_value, Producer};
use crate::error::MetricsError;
use crate::exchange::Exchange;
use crate::headers;
use crate::name::resolve_metric_name;
use crate::registry::{MetricKind, MetricRegistry};

/// Records one value per exchange into a histogram.
pub struct HistogramProducer {
    registry: Arc<dyn MetricRegistry>,
    name: String,
    value: Option<i64>,
}

impl HistogramProducer {
    pub fn new(
        registry: Arc<dyn MetricRegistry>,
        name: impl Into<String>,
        value: Option<i64>,
    ) -> Self {
        Self {
            registry,
            name: name.into(),
            value,
        }
    }
}

impl Producer for HistogramProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Histogram
    }

    fn process(&self, exchange: &mut Exchange) -> Result<(), MetricsError> {
        let metric_name = resolve_metric_name(&self.name, exchange);
        let value = header_value::<i64>(exchange, headers::HISTOGRAM_VALUE)?.or(self.value);

        match value {
            Some(value) => {
                self.registry.histogram(&metric_name)?.update(value);
                tracing::trace!(
                    exchange_id = exchange.id(),
                    metric = %metric_name,
                    value,
                    "Histogram updated"
                );
            }
            None => {
                tracing::warn!(
                    exchange_id = exchange.id(),
                    metric = %metric_name,
                    "No histogram value configured or set on exchange"
                );
            }
        }
        Ok(())
    }
}
