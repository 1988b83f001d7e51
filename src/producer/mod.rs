//! Metrics producers: pipeline steps that record into a registry.
//!
//! A producer is configured once and then invoked synchronously by the
//! pipeline for every exchange that passes its step. Producers keep no
//! per-exchange state of their own; the timer producer stores its in-flight
//! measurement on the exchange itself.
//!
//! - [`TimerProducer`]: start/stop a duration measurement
//! - [`CounterProducer`]: increment or decrement a counter
//! - [`HistogramProducer`]: record a value
//! - [`MeterProducer`]: mark events

mod counter;
mod histogram;
mod meter;
mod timer;

use std::str::FromStr;

use crate::error::MetricsError;
use crate::exchange::Exchange;
use crate::registry::MetricKind;

pub use counter::CounterProducer;
pub use histogram::HistogramProducer;
pub use meter::MeterProducer;
pub use timer::TimerProducer;

/// A pipeline step that records metrics for each exchange.
///
/// Errors from the registry are returned unchanged; the pipeline decides
/// what a failed step means for the exchange.
pub trait Producer: Send + Sync {
    /// Configured (default) metric name
    fn name(&self) -> &str;

    /// Kind of metric recorded
    fn kind(&self) -> MetricKind;

    /// Record metrics for one exchange.
    fn process(&self, exchange: &mut Exchange) -> Result<(), MetricsError>;
}

/// Parse an optional numeric override header.
fn header_value<T: FromStr>(
    exchange: &Exchange,
    header: &'static str,
) -> Result<Option<T>, MetricsError> {
    exchange
        .header(header)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| MetricsError::InvalidHeader {
                header,
                value: raw.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value_absent() {
        let exchange = Exchange::new();
        assert_eq!(header_value::<i64>(&exchange, "n").unwrap(), None);
    }

    #[test]
    fn test_header_value_parses() {
        let exchange = Exchange::new().with_header("n", " -12 ");
        assert_eq!(header_value::<i64>(&exchange, "n").unwrap(), Some(-12));
    }

    #[test]
    fn test_header_value_invalid() {
        let exchange = Exchange::new().with_header("n", "-1");
        let err = header_value::<u64>(&exchange, "n").unwrap_err();
        assert!(matches!(
            err,
            MetricsError::InvalidHeader { header: "n", ref value } if value == "-1"
        ));
    }
}
