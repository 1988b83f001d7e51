//! Configuration for the `tally` pipeline simulator.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - A JSON file describing the pipeline's metrics steps

use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::endpoint::{EndpointConfig, TimerAction, TimerPolicy};
use crate::error::MetricsError;
use crate::observability::tracing::LogFormat;

/// Registry backend to record into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Otel,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "otel" => Ok(Self::Otel),
            _ => Err(format!("unknown backend: {}", s)),
        }
    }
}

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

/// Tally: runs simulated exchanges through an instrumented pipeline.
#[derive(Parser, Debug, Clone)]
#[command(name = "tally")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Number of exchanges to run
    #[arg(short = 'n', long, env = "TALLY_EXCHANGES", default_value_t = 1000)]
    pub exchanges: usize,

    /// Worker threads driving exchanges
    #[arg(short, long, env = "TALLY_WORKERS", default_value_t = 4)]
    pub workers: usize,

    /// Simulated work per step, in microseconds
    #[arg(long, env = "TALLY_WORK_MICROS", default_value_t = 200)]
    pub work_micros: u64,

    /// Pipeline steps as a JSON file (array of endpoint configs)
    #[arg(short, long, env = "TALLY_PIPELINE")]
    pub pipeline: Option<PathBuf>,

    /// Timer policy for the built-in pipeline
    #[arg(long, env = "TALLY_TIMER_POLICY", default_value = "lenient")]
    pub timer_policy: TimerPolicy,

    /// Registry backend (memory, otel)
    #[arg(long, env = "TALLY_BACKEND", default_value = "memory")]
    pub backend: Backend,

    /// Report format (text, json)
    #[arg(short, long, default_value = "text")]
    pub output: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TALLY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "TALLY_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,
}

/// On-disk pipeline description.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct PipelineFile {
    steps: Vec<EndpointConfig>,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Steps from `--pipeline`, or the built-in pipeline.
    pub fn steps(&self) -> Result<Vec<EndpointConfig>, MetricsError> {
        match &self.pipeline {
            Some(path) => load_pipeline(path),
            None => Ok(default_pipeline(self.timer_policy)),
        }
    }

    /// Create a default configuration for testing.
    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            exchanges: 10,
            workers: 2,
            work_micros: 0,
            pipeline: None,
            timer_policy: TimerPolicy::Lenient,
            backend: Backend::Memory,
            output: OutputFormat::Text,
            log_level: "debug".into(),
            log_format: LogFormat::Text,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchanges: 1000,
            workers: 4,
            work_micros: 200,
            pipeline: None,
            timer_policy: TimerPolicy::Lenient,
            backend: Backend::Memory,
            output: OutputFormat::Text,
            log_level: "info".into(),
            log_format: LogFormat::Text,
        }
    }
}

/// Read a JSON array of endpoint configs.
pub fn load_pipeline(path: &Path) -> Result<Vec<EndpointConfig>, MetricsError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| MetricsError::Config(format!("cannot read {}: {e}", path.display())))?;
    let file: PipelineFile = serde_json::from_str(&raw)
        .map_err(|e| MetricsError::Config(format!("invalid pipeline {}: {e}", path.display())))?;
    Ok(file.steps)
}

/// Timer around a histogram, counter and meter.
///
/// The histogram value comes from the per-exchange header the simulator sets.
pub fn default_pipeline(policy: TimerPolicy) -> Vec<EndpointConfig> {
    vec![
        EndpointConfig::timer("pipeline.latency", Some(TimerAction::Start)).with_policy(policy),
        EndpointConfig::histogram("pipeline.payload_bytes", None),
        EndpointConfig::counter("pipeline.processed"),
        EndpointConfig::meter("pipeline.throughput"),
        EndpointConfig::timer("pipeline.latency", Some(TimerAction::Stop)).with_policy(policy),
    ]
}
