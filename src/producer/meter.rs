//! Meter producer.

use std::sync::Arc;

use super::{header_value, Producer};
use crate::error::MetricsError;
use crate::exchange::Exchange;
use crate::headers;
use crate::name::resolve_metric_name;
use crate::registry::{MetricKind, MetricRegistry};

/// Marks a meter once per exchange.
pub struct MeterProducer {
    registry: Arc<dyn MetricRegistry>,
    name: String,
    mark: Option<u64>,
}

impl MeterProducer {
    pub fn new(registry: Arc<dyn MetricRegistry>, name: impl Into<String>) -> Self {
        Self {
            registry,
            name: name.into(),
            mark: None,
        }
    }

    #[must_use]
    pub fn with_mark(mut self, mark: Option<u64>) -> Self {
        self.mark = mark;
        self
    }
}

impl Producer for MeterProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Meter
    }

    fn process(&self, exchange: &mut Exchange) -> Result<(), MetricsError> {
        let metric_name = resolve_metric_name(&self.name, exchange);
        let mark = header_value::<u64>(exchange, headers::METER_MARK)?
            .or(self.mark)
            .unwrap_or(1);

        self.registry.meter(&metric_name)?.mark(mark);
        tracing::trace!(exchange_id = exchange.id(), metric = %metric_name, mark, "Meter marked");
        Ok(())
    }
}
