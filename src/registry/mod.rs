//! Metric registry facade.
//!
//! Producers talk to a [`MetricRegistry`] and never to a concrete metrics
//! library. Lookups are idempotent by name: asking twice for the same name
//! yields handles to the same underlying aggregate. Asking for a name that is
//! already bound to another kind of metric is a [`RegistryError`].
//!
//! Backends:
//! - [`memory`]: in-process aggregates with snapshot reads
//! - [`otel`]: OpenTelemetry instruments on a `Meter`

pub mod memory;
pub mod otel;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::RegistryError;

pub use memory::InMemoryRegistry;
pub use otel::OtelRegistry;

/// The four kinds of metric a registry hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Histogram,
    Meter,
    Timer,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Counter => "counter",
            Self::Histogram => "histogram",
            Self::Meter => "meter",
            Self::Timer => "timer",
        };
        f.write_str(s)
    }
}

/// A value that can go up and down.
pub trait Counter: Send + Sync {
    fn inc(&self, n: i64);

    /// Subtract `n`. `i64::MIN` cannot be negated and is ignored.
    fn dec(&self, n: i64);
}

/// A distribution of integer samples.
pub trait Histogram: Send + Sync {
    /// Record one sample. Backends that aggregate in `f64` lose precision
    /// for magnitudes above 2^53.
    fn update(&self, value: i64);
}

/// A rate of events.
pub trait Meter: Send + Sync {
    fn mark(&self, n: u64);
}

/// A distribution of durations.
pub trait Timer: Send + Sync {
    fn update(&self, elapsed: Duration);
}

/// Lookup-or-create access to named metrics.
///
/// Implementations must be safe to share across threads; producers hold an
/// `Arc<dyn MetricRegistry>` and call it from whichever thread drives the
/// exchange.
pub trait MetricRegistry: Send + Sync {
    fn counter(&self, name: &str) -> Result<Arc<dyn Counter>, RegistryError>;
    fn histogram(&self, name: &str) -> Result<Arc<dyn Histogram>, RegistryError>;
    fn meter(&self, name: &str) -> Result<Arc<dyn Meter>, RegistryError>;
    fn timer(&self, name: &str) -> Result<Arc<dyn Timer>, RegistryError>;
}

/// Starting a measurement on a shared timer handle.
pub trait TimerExt {
    /// Begin measuring. The returned context records into this timer when
    /// stopped.
    fn time(&self) -> TimerContext;
}

impl TimerExt for Arc<dyn Timer> {
    fn time(&self) -> TimerContext {
        TimerContext::start(Arc::clone(self))
    }
}

/// A measurement in progress.
///
/// `stop` consumes the context, so a measurement can be recorded at most once.
/// Dropping a context without stopping it records nothing.
pub struct TimerContext {
    timer: Arc<dyn Timer>,
    started: Instant,
}

impl TimerContext {
    pub fn start(timer: Arc<dyn Timer>) -> Self {
        Self {
            timer,
            started: Instant::now(),
        }
    }

    /// Time since the measurement began.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record the elapsed time into the timer and return it.
    pub fn stop(self) -> Duration {
        let elapsed = self.started.elapsed();
        self.timer.update(elapsed);
        elapsed
    }
}

impl fmt::Debug for TimerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerContext")
            .field("elapsed", &self.elapsed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct SampleTimer {
        samples: Mutex<Vec<Duration>>,
    }

    impl Timer for SampleTimer {
        fn update(&self, elapsed: Duration) {
            self.samples.lock().unwrap().push(elapsed);
        }
    }

    #[test]
    fn test_metric_kind_display() {
        assert_eq!(MetricKind::Counter.to_string(), "counter");
        assert_eq!(MetricKind::Timer.to_string(), "timer");
    }

    #[test]
    fn test_context_stop_records_once() {
        let sink = Arc::new(SampleTimer::default());
        let timer: Arc<dyn Timer> = sink.clone();

        let context = timer.time();
        std::thread::sleep(Duration::from_millis(2));
        let elapsed = context.stop();

        let samples = sink.samples.lock().unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0], elapsed);
        assert!(elapsed >= Duration::from_millis(2));
    }

    #[test]
    fn test_dropped_context_records_nothing() {
        let sink = Arc::new(SampleTimer::default());
        let timer: Arc<dyn Timer> = sink.clone();

        drop(timer.time());

        assert!(sink.samples.lock().unwrap().is_empty());
    }

    #[test]
    fn test_context_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<TimerContext>();
    }
}
