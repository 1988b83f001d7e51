//! Tally: metrics instrumentation for message pipelines.
//!
//! Tally attaches timing and counting measurements to exchanges flowing
//! through a routing pipeline without owning the pipeline. Each metrics step
//! is a [`Producer`] that the pipeline calls synchronously for every exchange.
//!
//! # Timers
//!
//! A timer start step and a stop step with the same metric name bracket a
//! segment of the route. The measurement in progress is stored on the exchange
//! itself, keyed by `<namespace>:<metric name>`, so it is dropped together
//! with the exchange and needs no shared map or locking. A second start on a
//! running timer and a stop on an idle one are no-ops unless the producer is
//! configured with [`TimerPolicy::Strict`].
//!
//! # Modules
//!
//! - [`component`]: Registry bindings and producer construction
//! - [`config`]: CLI configuration for the simulator binary
//! - [`endpoint`]: Static per-step configuration
//! - [`exchange`]: The unit of work and its property bag
//! - [`headers`]: Per-message override header names
//! - [`name`]: Metric name resolution and validation
//! - [`observability`]: Tracing setup
//! - [`producer`]: Timer, counter, histogram and meter steps
//! - [`registry`]: Registry facade and backends
//! - [`simulate`]: Multi-threaded pipeline simulator

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // producer::timer::TimerProducer is fine
    clippy::must_use_candidate,      // Not all functions need #[must_use]
    clippy::missing_errors_doc,      // Error docs can be verbose
    clippy::cast_precision_loss      // Snapshot means are approximate
)]

pub mod component;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod exchange;
pub mod headers;
pub mod name;
pub mod observability;
pub mod producer;
pub mod registry;
pub mod simulate;

use uuid::Uuid;

pub use component::{MetricsComponent, RegistryBindings, METRIC_REGISTRY_NAME};
pub use endpoint::{EndpointConfig, TimerAction, TimerPolicy};
pub use error::{MetricsError, RegistryError};
pub use exchange::Exchange;
pub use name::resolve_metric_name;
pub use producer::Producer;
pub use registry::{MetricKind, MetricRegistry, TimerContext};

/// Generate a new UUIDv7 (time-sortable) exchange ID.
///
/// # Example
///
/// ```
/// let id = tally::generate_exchange_id();
/// assert!(id.len() == 36); // UUID string format
/// ```
#[must_use]
pub fn generate_exchange_id() -> String {
    Uuid::now_v7().to_string()
}
