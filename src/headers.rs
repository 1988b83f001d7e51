//! Reserved header names read by metrics producers.
//!
//! Senders set these on an exchange to override a producer's static
//! configuration for that one message.

/// Overrides the configured metric name
pub const METRIC_NAME: &str = "tally.metric_name";

/// Overrides the counter increment (integer)
pub const COUNTER_INCREMENT: &str = "tally.counter.increment";

/// Overrides the counter decrement (integer)
pub const COUNTER_DECREMENT: &str = "tally.counter.decrement";

/// Overrides the histogram value (integer)
pub const HISTOGRAM_VALUE: &str = "tally.histogram.value";

/// Overrides the meter mark (non-negative integer)
pub const METER_MARK: &str = "tally.meter.mark";
