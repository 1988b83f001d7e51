//! OpenTelemetry registry backend.
//!
//! Maps the registry facade onto OTel instruments:
//! - counter: `i64_up_down_counter`
//! - histogram: `f64_histogram`
//! - meter: `u64_counter`
//! - timer: `f64_histogram` in seconds
//!
//! OTel meters do not detect kind conflicts between instruments sharing a
//! name, so instruments are cached here by name.

use opentelemetry::global;
use opentelemetry::metrics::{self as otel, UpDownCounter};
use opentelemetry_sdk::metrics::{ManualReader, SdkMeterProvider};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;

use super::{Counter, Histogram, Meter, MetricKind, MetricRegistry, Timer};
use crate::error::RegistryError;

/// Instrumentation scope name for meters created by this crate.
pub const METER_NAME: &str = "tally";

static PROVIDER: OnceLock<()> = OnceLock::new();

/// Install the global meter provider and return this crate's meter.
///
/// Samples are aggregated by a manual reader and never exported. Subsequent
/// calls reuse the provider installed by the first one.
pub fn init_meter_provider() -> otel::Meter {
    PROVIDER.get_or_init(|| {
        let reader = ManualReader::builder().build();
        let provider = SdkMeterProvider::builder().with_reader(reader).build();
        global::set_meter_provider(provider);
        tracing::info!(meter = METER_NAME, "OpenTelemetry meter provider installed");
    });
    global::meter(METER_NAME)
}

struct OtelCounter(UpDownCounter<i64>);

impl Counter for OtelCounter {
    fn inc(&self, n: i64) {
        self.0.add(n, &[]);
    }

    fn dec(&self, n: i64) {
        match n.checked_neg() {
            Some(delta) => self.0.add(delta, &[]),
            None => tracing::warn!(n, "Counter decrement out of range, ignored"),
        }
    }
}

struct OtelHistogram(otel::Histogram<f64>);

impl Histogram for OtelHistogram {
    // Exact up to 2^53.
    fn update(&self, value: i64) {
        self.0.record(value as f64, &[]);
    }
}

struct OtelMeter(otel::Counter<u64>);

impl Meter for OtelMeter {
    fn mark(&self, n: u64) {
        self.0.add(n, &[]);
    }
}

struct OtelTimer(otel::Histogram<f64>);

impl Timer for OtelTimer {
    fn update(&self, elapsed: Duration) {
        self.0.record(elapsed.as_secs_f64(), &[]);
    }
}

#[derive(Clone)]
enum Instrument {
    Counter(Arc<OtelCounter>),
    Histogram(Arc<OtelHistogram>),
    Meter(Arc<OtelMeter>),
    Timer(Arc<OtelTimer>),
}

impl Instrument {
    fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Histogram(_) => MetricKind::Histogram,
            Self::Meter(_) => MetricKind::Meter,
            Self::Timer(_) => MetricKind::Timer,
        }
    }
}

/// Registry backed by an OpenTelemetry [`Meter`](otel::Meter).
pub struct OtelRegistry {
    meter: otel::Meter,
    instruments: RwLock<HashMap<String, Instrument>>,
}

impl OtelRegistry {
    pub fn new(meter: otel::Meter) -> Self {
        Self {
            meter,
            instruments: RwLock::new(HashMap::new()),
        }
    }

    /// Registry on the global meter provider, installing it if needed.
    pub fn global() -> Self {
        Self::new(init_meter_provider())
    }

    /// Number of instruments created so far.
    pub fn len(&self) -> usize {
        self.instruments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build(&self, name: &str, kind: MetricKind) -> Instrument {
        let name = name.to_string();
        match kind {
            MetricKind::Counter => Instrument::Counter(Arc::new(OtelCounter(
                self.meter
                    .i64_up_down_counter(name)
                    .with_description("Pipeline counter")
                    .with_unit("1")
                    .init(),
            ))),
            MetricKind::Histogram => Instrument::Histogram(Arc::new(OtelHistogram(
                self.meter
                    .f64_histogram(name)
                    .with_description("Pipeline value distribution")
                    .init(),
            ))),
            MetricKind::Meter => Instrument::Meter(Arc::new(OtelMeter(
                self.meter
                    .u64_counter(name)
                    .with_description("Pipeline event rate")
                    .with_unit("1")
                    .init(),
            ))),
            MetricKind::Timer => Instrument::Timer(Arc::new(OtelTimer(
                self.meter
                    .f64_histogram(name)
                    .with_description("Pipeline segment duration")
                    .with_unit("s")
                    .init(),
            ))),
        }
    }

    fn get_or_insert(&self, name: &str, kind: MetricKind) -> Instrument {
        if let Some(instrument) = self
            .instruments
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return instrument.clone();
        }
        let mut instruments = self
            .instruments
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(instrument) = instruments.get(name) {
            return instrument.clone();
        }
        let instrument = self.build(name, kind);
        instruments.insert(name.to_string(), instrument.clone());
        tracing::debug!(name, %kind, "Created OpenTelemetry instrument");
        instrument
    }
}

fn conflict(name: &str, registered: MetricKind, requested: MetricKind) -> RegistryError {
    RegistryError::TypeConflict {
        name: name.to_string(),
        registered,
        requested,
    }
}

impl MetricRegistry for OtelRegistry {
    fn counter(&self, name: &str) -> Result<Arc<dyn Counter>, RegistryError> {
        match self.get_or_insert(name, MetricKind::Counter) {
            Instrument::Counter(c) => Ok(c),
            other => Err(conflict(name, other.kind(), MetricKind::Counter)),
        }
    }

    fn histogram(&self, name: &str) -> Result<Arc<dyn Histogram>, RegistryError> {
        match self.get_or_insert(name, MetricKind::Histogram) {
            Instrument::Histogram(h) => Ok(h),
            other => Err(conflict(name, other.kind(), MetricKind::Histogram)),
        }
    }

    fn meter(&self, name: &str) -> Result<Arc<dyn Meter>, RegistryError> {
        match self.get_or_insert(name, MetricKind::Meter) {
            Instrument::Meter(m) => Ok(m),
            other => Err(conflict(name, other.kind(), MetricKind::Meter)),
        }
    }

    fn timer(&self, name: &str) -> Result<Arc<dyn Timer>, RegistryError> {
        match self.get_or_insert(name, MetricKind::Timer) {
            Instrument::Timer(t) => Ok(t),
            other => Err(conflict(name, other.kind(), MetricKind::Timer)),
        }
    }
}
