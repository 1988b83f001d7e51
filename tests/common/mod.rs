//! Test utilities for Tally integration tests.
//!
//! Provides:
//! - A registry that records every interaction in order
//! - Helpers for building producers from endpoint configs

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tally::observability::tracing::init_test_tracing;
use tally::registry::{Counter, Histogram, Meter, MetricRegistry, Timer};
use tally::{EndpointConfig, MetricsComponent, Producer, RegistryError};

/// One interaction with a [`RecordingRegistry`] or a metric it handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Counter(String),
    Histogram(String),
    Meter(String),
    Timer(String),
    Inc(String, i64),
    Dec(String, i64),
    Update(String, i64),
    Mark(String, u64),
    Record(String),
}

type CallLog = Arc<Mutex<Vec<Call>>>;

struct Recorder {
    name: String,
    log: CallLog,
}

impl Recorder {
    fn push(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }
}

impl Counter for Recorder {
    fn inc(&self, n: i64) {
        self.push(Call::Inc(self.name.clone(), n));
    }

    fn dec(&self, n: i64) {
        self.push(Call::Dec(self.name.clone(), n));
    }
}

impl Histogram for Recorder {
    fn update(&self, value: i64) {
        self.push(Call::Update(self.name.clone(), value));
    }
}

impl Meter for Recorder {
    fn mark(&self, n: u64) {
        self.push(Call::Mark(self.name.clone(), n));
    }
}

impl Timer for Recorder {
    fn update(&self, _elapsed: Duration) {
        self.push(Call::Record(self.name.clone()));
    }
}

/// Registry that hands out fresh recording metrics and logs every call.
///
/// Unlike a real registry it never detects kind conflicts.
#[derive(Clone, Default)]
pub struct RecordingRegistry {
    log: CallLog,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    /// All calls so far, clearing the log.
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }

    fn recorder(&self, call: Call, name: &str) -> Arc<Recorder> {
        self.log.lock().unwrap().push(call);
        Arc::new(Recorder {
            name: name.to_string(),
            log: Arc::clone(&self.log),
        })
    }
}

impl MetricRegistry for RecordingRegistry {
    fn counter(&self, name: &str) -> Result<Arc<dyn Counter>, RegistryError> {
        Ok(self.recorder(Call::Counter(name.into()), name))
    }

    fn histogram(&self, name: &str) -> Result<Arc<dyn Histogram>, RegistryError> {
        Ok(self.recorder(Call::Histogram(name.into()), name))
    }

    fn meter(&self, name: &str) -> Result<Arc<dyn Meter>, RegistryError> {
        Ok(self.recorder(Call::Meter(name.into()), name))
    }

    fn timer(&self, name: &str) -> Result<Arc<dyn Timer>, RegistryError> {
        Ok(self.recorder(Call::Timer(name.into()), name))
    }
}

/// Build a producer for `config` on `registry`.
pub fn producer(registry: Arc<dyn MetricRegistry>, config: &EndpointConfig) -> Box<dyn Producer> {
    init_test_tracing();
    MetricsComponent::with_registry(registry)
        .create_producer(config)
        .expect("valid endpoint config")
}
