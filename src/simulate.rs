//! Pipeline simulator used by the `tally` binary.
//!
//! Drives synthetic exchanges through a fixed list of producers on a pool of
//! scoped worker threads. Each exchange is owned by exactly one worker from
//! creation to drop.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::exchange::Exchange;
use crate::headers;
use crate::producer::Producer;

/// Outcome of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub exchanges: usize,
    pub failed: usize,
    pub elapsed_ms: f64,
}

/// Settings for one run.
#[derive(Debug, Clone, Copy)]
pub struct Simulation {
    pub exchanges: usize,
    pub workers: usize,
    pub work: Duration,
}

impl Simulation {
    /// Run every exchange through `steps` in order.
    ///
    /// A failing step aborts the rest of that exchange's steps; the run
    /// continues with the next exchange.
    pub fn run(&self, steps: &[Box<dyn Producer>]) -> RunSummary {
        let started = Instant::now();
        let next = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let workers = self.workers.max(1);

        thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| loop {
                    let seq = next.fetch_add(1, Ordering::SeqCst);
                    if seq >= self.exchanges {
                        break;
                    }
                    let mut exchange = synthetic_exchange(seq);
                    if let Err(e) = run_exchange(steps, &mut exchange, self.work) {
                        failed.fetch_add(1, Ordering::SeqCst);
                        tracing::warn!(exchange_id = exchange.id(), error = %e, "Exchange failed");
                    }
                });
            }
        });

        RunSummary {
            exchanges: self.exchanges,
            failed: failed.load(Ordering::SeqCst),
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        }
    }
}

/// Exchange with a payload whose size varies with `seq`.
fn synthetic_exchange(seq: usize) -> Exchange {
    let size = 64 + (seq * 37) % 960;
    Exchange::new()
        .with_header(headers::HISTOGRAM_VALUE, size.to_string())
        .with_body(vec![0u8; size])
}

fn run_exchange(
    steps: &[Box<dyn Producer>],
    exchange: &mut Exchange,
    work: Duration,
) -> Result<(), crate::MetricsError> {
    for step in steps {
        step.process(exchange)?;
        if !work.is_zero() {
            thread::sleep(work);
        }
    }
    Ok(())
}
