//! In-process registry backend.
//!
//! Aggregates live in memory for the lifetime of the registry and can be read
//! back with [`InMemoryRegistry::snapshot`]. Used by the demo binary and by
//! tests that need to assert on recorded samples.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::{Counter, Histogram, Meter, MetricKind, MetricRegistry, Timer};
use crate::error::RegistryError;

#[derive(Debug, Default)]
pub struct MemoryCounter {
    value: AtomicI64,
}

impl MemoryCounter {
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }
}

impl Counter for MemoryCounter {
    fn inc(&self, n: i64) {
        self.value.fetch_add(n, Ordering::SeqCst);
    }

    fn dec(&self, n: i64) {
        match n.checked_neg() {
            Some(delta) => {
                self.value.fetch_add(delta, Ordering::SeqCst);
            }
            None => tracing::warn!(n, "Counter decrement out of range, ignored"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct HistogramStats {
    count: u64,
    sum: i128,
    min: i64,
    max: i64,
}

#[derive(Debug, Default)]
pub struct MemoryHistogram {
    stats: Mutex<HistogramStats>,
}

impl Histogram for MemoryHistogram {
    fn update(&self, value: i64) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        if stats.count == 0 {
            stats.min = value;
            stats.max = value;
        } else {
            stats.min = stats.min.min(value);
            stats.max = stats.max.max(value);
        }
        stats.count += 1;
        stats.sum += i128::from(value);
    }
}

impl MemoryHistogram {
    pub fn snapshot(&self) -> HistogramSnapshot {
        let stats = *self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        HistogramSnapshot {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: if stats.count == 0 {
                0.0
            } else {
                stats.sum as f64 / stats.count as f64
            },
        }
    }
}

#[derive(Debug)]
pub struct MemoryMeter {
    count: AtomicU64,
    created: Instant,
}

impl Default for MemoryMeter {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            created: Instant::now(),
        }
    }
}

impl Meter for MemoryMeter {
    fn mark(&self, n: u64) {
        self.count.fetch_add(n, Ordering::SeqCst);
    }
}

impl MemoryMeter {
    pub fn snapshot(&self) -> MeterSnapshot {
        let count = self.count.load(Ordering::SeqCst);
        let secs = self.created.elapsed().as_secs_f64();
        MeterSnapshot {
            count,
            mean_rate: if secs > 0.0 { count as f64 / secs } else { 0.0 },
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct TimerStats {
    count: u64,
    total: Duration,
    min: Duration,
    max: Duration,
}

#[derive(Debug, Default)]
pub struct MemoryTimer {
    stats: Mutex<TimerStats>,
}

impl Timer for MemoryTimer {
    fn update(&self, elapsed: Duration) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        if stats.count == 0 {
            stats.min = elapsed;
            stats.max = elapsed;
        } else {
            stats.min = stats.min.min(elapsed);
            stats.max = stats.max.max(elapsed);
        }
        stats.count += 1;
        stats.total += elapsed;
    }
}

impl MemoryTimer {
    pub fn snapshot(&self) -> TimerSnapshot {
        let stats = *self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        TimerSnapshot {
            count: stats.count,
            min_ms: ms(stats.min),
            max_ms: ms(stats.max),
            mean_ms: if stats.count == 0 {
                0.0
            } else {
                ms(stats.total) / stats.count as f64
            },
            total_ms: ms(stats.total),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub min: i64,
    pub max: i64,
    pub mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeterSnapshot {
    pub count: u64,
    pub mean_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub count: u64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub total_ms: f64,
}

/// Point-in-time view of every metric in an [`InMemoryRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrySnapshot {
    pub counters: BTreeMap<String, i64>,
    pub histograms: BTreeMap<String, HistogramSnapshot>,
    pub meters: BTreeMap<String, MeterSnapshot>,
    pub timers: BTreeMap<String, TimerSnapshot>,
}

#[derive(Clone)]
enum Entry {
    Counter(Arc<MemoryCounter>),
    Histogram(Arc<MemoryHistogram>),
    Meter(Arc<MemoryMeter>),
    Timer(Arc<MemoryTimer>),
}

impl Entry {
    fn new(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => Self::Counter(Arc::default()),
            MetricKind::Histogram => Self::Histogram(Arc::default()),
            MetricKind::Meter => Self::Meter(Arc::default()),
            MetricKind::Timer => Self::Timer(Arc::default()),
        }
    }

    fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Histogram(_) => MetricKind::Histogram,
            Self::Meter(_) => MetricKind::Meter,
            Self::Timer(_) => MetricKind::Timer,
        }
    }
}

/// Thread-safe in-memory registry.
#[derive(Default)]
pub struct InMemoryRegistry {
    metrics: RwLock<HashMap<String, Entry>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let metrics = self.metrics.read().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = RegistrySnapshot::default();
        for (name, entry) in metrics.iter() {
            match entry {
                Entry::Counter(c) => {
                    snapshot.counters.insert(name.clone(), c.value());
                }
                Entry::Histogram(h) => {
                    snapshot.histograms.insert(name.clone(), h.snapshot());
                }
                Entry::Meter(m) => {
                    snapshot.meters.insert(name.clone(), m.snapshot());
                }
                Entry::Timer(t) => {
                    snapshot.timers.insert(name.clone(), t.snapshot());
                }
            }
        }
        snapshot
    }

    fn get_or_insert(&self, name: &str, kind: MetricKind) -> Entry {
        if let Some(entry) = self
            .metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return entry.clone();
        }
        self.metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert_with(|| Entry::new(kind))
            .clone()
    }
}

fn conflict(name: &str, registered: MetricKind, requested: MetricKind) -> RegistryError {
    RegistryError::TypeConflict {
        name: name.to_string(),
        registered,
        requested,
    }
}

impl MetricRegistry for InMemoryRegistry {
    fn counter(&self, name: &str) -> Result<Arc<dyn Counter>, RegistryError> {
        match self.get_or_insert(name, MetricKind::Counter) {
            Entry::Counter(c) => Ok(c),
            other => Err(conflict(name, other.kind(), MetricKind::Counter)),
        }
    }

    fn histogram(&self, name: &str) -> Result<Arc<dyn Histogram>, RegistryError> {
        match self.get_or_insert(name, MetricKind::Histogram) {
            Entry::Histogram(h) => Ok(h),
            other => Err(conflict(name, other.kind(), MetricKind::Histogram)),
        }
    }

    fn meter(&self, name: &str) -> Result<Arc<dyn Meter>, RegistryError> {
        match self.get_or_insert(name, MetricKind::Meter) {
            Entry::Meter(m) => Ok(m),
            other => Err(conflict(name, other.kind(), MetricKind::Meter)),
        }
    }

    fn timer(&self, name: &str) -> Result<Arc<dyn Timer>, RegistryError> {
        match self.get_or_insert(name, MetricKind::Timer) {
            Entry::Timer(t) => Ok(t),
            other => Err(conflict(name, other.kind(), MetricKind::Timer)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TimerExt;

    #[test]
    fn test_new_registry_is_empty() {
        let registry = InMemoryRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.snapshot(), RegistrySnapshot::default());
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let registry = InMemoryRegistry::new();
        registry.counter("hits").unwrap().inc(2);
        registry.counter("hits").unwrap().inc(3);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot().counters["hits"], 5);
    }

    #[test]
    fn test_same_name_different_kind_conflicts() {
        let registry = InMemoryRegistry::new();
        registry.timer("A").unwrap();

        let err = registry.histogram("A").err().unwrap();
        assert_eq!(
            err,
            RegistryError::TypeConflict {
                name: "A".into(),
                registered: MetricKind::Timer,
                requested: MetricKind::Histogram,
            }
        );
        assert!(registry.timer("A").is_ok());
    }

    #[test]
    fn test_counter_inc_dec() {
        let registry = InMemoryRegistry::new();
        let counter = registry.counter("c").unwrap();
        counter.inc(10);
        counter.dec(4);
        assert_eq!(registry.snapshot().counters["c"], 6);
    }

    #[test]
    fn test_counter_min_decrement_is_ignored() {
        let registry = InMemoryRegistry::new();
        let counter = registry.counter("c").unwrap();
        counter.inc(1);
        counter.dec(i64::MIN);
        assert_eq!(registry.snapshot().counters["c"], 1);
    }

    #[test]
    fn test_histogram_stats() {
        let registry = InMemoryRegistry::new();
        let histogram = registry.histogram("h").unwrap();
        for value in [5, 1, 9] {
            histogram.update(value);
        }

        let snapshot = registry.snapshot().histograms["h"];
        assert_eq!(snapshot.count, 3);
        assert_eq!(snapshot.min, 1);
        assert_eq!(snapshot.max, 9);
        assert!((snapshot.mean - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_meter_count() {
        let registry = InMemoryRegistry::new();
        let meter = registry.meter("m").unwrap();
        meter.mark(1);
        meter.mark(4);
        assert_eq!(registry.snapshot().meters["m"].count, 5);
    }

    #[test]
    fn test_timer_records_samples() {
        let registry = InMemoryRegistry::new();
        let timer = registry.timer("t").unwrap();
        timer.update(Duration::from_millis(10));
        timer.update(Duration::from_millis(30));

        let snapshot = registry.snapshot().timers["t"];
        assert_eq!(snapshot.count, 2);
        assert!((snapshot.min_ms - 10.0).abs() < 1e-6);
        assert!((snapshot.max_ms - 30.0).abs() < 1e-6);
        assert!((snapshot.mean_ms - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_timer_context_records_into_registry() {
        let registry = InMemoryRegistry::new();
        let context = registry.timer("t").unwrap().time();
        context.stop();
        assert_eq!(registry.snapshot().timers["t"].count, 1);
    }

    #[test]
    fn test_concurrent_lookups_share_one_metric() {
        let registry = Arc::new(InMemoryRegistry::new());
        std::thread::scope(|s| {
            for _ in 0..8 {
                let registry = Arc::clone(&registry);
                s.spawn(move || {
                    for _ in 0..100 {
                        registry.counter("shared").unwrap().inc(1);
                    }
                });
            }
        });
        assert_eq!(registry.snapshot().counters["shared"], 800);
    }

    #[test]
    fn test_snapshot_serializes() {
        let registry = InMemoryRegistry::new();
        registry.counter("c").unwrap().inc(1);
        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json["counters"]["c"], 1);
    }
}
