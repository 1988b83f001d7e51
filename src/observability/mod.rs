//! Observability infrastructure.
//!
//! Provides:
//! - Structured logging via `tracing`, plain or JSON

pub mod tracing;
