//! Tally: runs simulated exchanges through an instrumented pipeline.
//!
//! # Usage
//!
//! ```bash
//! tally --exchanges 1000 --workers 4 --output json
//! tally --pipeline steps.json --backend otel
//! ```
//!
//! Environment variables can also be used:
//! - `TALLY_EXCHANGES`: Number of exchanges
//! - `TALLY_PIPELINE`: Pipeline steps JSON file
//! - `RUST_LOG`: Log filter (overrides `--log-level`)

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use tally::config::{Backend, Config, OutputFormat};
use tally::observability::tracing::init_tracing;
use tally::registry::{InMemoryRegistry, MetricRegistry, OtelRegistry};
use tally::simulate::{RunSummary, Simulation};
use tally::{MetricsComponent, Producer, RegistryBindings, METRIC_REGISTRY_NAME};

/// Print run configuration to stderr.
fn print_banner(config: &Config, steps: usize) {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        r#"
  Tally v{} - pipeline metrics simulator

  Configuration:
    Exchanges:  {}
    Workers:    {}
    Steps:      {}
    Backend:    {:?}
"#,
        version, config.exchanges, config.workers, steps, config.backend
    );
}

fn print_report(
    summary: &RunSummary,
    memory: Option<&InMemoryRegistry>,
    output: OutputFormat,
) -> Result<()> {
    match output {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "summary": summary,
                "metrics": memory.map(InMemoryRegistry::snapshot),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "{} exchanges, {} failed, {:.1} ms",
                summary.exchanges, summary.failed, summary.elapsed_ms
            );
            if let Some(registry) = memory {
                let snapshot = registry.snapshot();
                for (name, t) in &snapshot.timers {
                    println!(
                        "timer     {name}: count={} mean={:.3}ms min={:.3}ms max={:.3}ms",
                        t.count, t.mean_ms, t.min_ms, t.max_ms
                    );
                }
                for (name, h) in &snapshot.histograms {
                    println!(
                        "histogram {name}: count={} mean={:.1} min={} max={}",
                        h.count, h.mean, h.min, h.max
                    );
                }
                for (name, value) in &snapshot.counters {
                    println!("counter   {name}: {value}");
                }
                for (name, m) in &snapshot.meters {
                    println!(
                        "meter     {name}: count={} rate={:.1}/s",
                        m.count, m.mean_rate
                    );
                }
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();

    // Initialize tracing/logging
    init_tracing(&config.log_level, config.log_format);

    let steps = config.steps().context("failed to load pipeline")?;

    // Bind the registry the component will resolve
    let memory = match config.backend {
        Backend::Memory => Some(Arc::new(InMemoryRegistry::new())),
        Backend::Otel => None,
    };
    let registry: Arc<dyn MetricRegistry> = match &memory {
        Some(registry) => registry.clone(),
        None => Arc::new(OtelRegistry::global()),
    };
    let bindings = RegistryBindings::new().with(METRIC_REGISTRY_NAME, registry);
    let component = MetricsComponent::new(&bindings)?;

    let producers = steps
        .iter()
        .map(|step| component.create_producer(step))
        .collect::<Result<Vec<Box<dyn Producer>>, _>>()
        .context("invalid pipeline step")?;

    print_banner(&config, producers.len());

    let simulation = Simulation {
        exchanges: config.exchanges,
        workers: config.workers,
        work: Duration::from_micros(config.work_micros),
    };
    let summary = simulation.run(&producers);

    tracing::info!(
        exchanges = summary.exchanges,
        failed = summary.failed,
        elapsed_ms = summary.elapsed_ms,
        "Simulation complete"
    );

    print_report(&summary, memory.as_deref(), config.output)
}
