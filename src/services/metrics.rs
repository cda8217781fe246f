//! Timing measurements.
//!
//! A [`MetricTimer`] is started at the top of a scoped operation and records
//! its elapsed time when dropped, so every exit path (success, early return,
//! `?`) closes the measurement exactly once.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

pub trait MetricsSink: Send + Sync {
    fn record(&self, name: &'static str, elapsed: Duration);
}

/// Default sink: emits each measurement as a debug event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn record(&self, name: &'static str, elapsed: Duration) {
        debug!(
            target: "bearer_gate::metrics",
            metric = name,
            elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            "timing recorded"
        );
    }
}

/// Keeps every measurement in memory.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    samples: Mutex<Vec<(&'static str, Duration)>>,
}

impl RecordingMetrics {
    pub fn samples(&self) -> Vec<(&'static str, Duration)> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(n, _)| *n == name)
            .count()
    }
}

impl MetricsSink for RecordingMetrics {
    fn record(&self, name: &'static str, elapsed: Duration) {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name, elapsed));
    }
}

#[must_use = "the measurement is recorded when the timer is dropped"]
pub struct MetricTimer<'a> {
    sink: &'a dyn MetricsSink,
    name: &'static str,
    started: Instant,
}

impl<'a> MetricTimer<'a> {
    pub fn start(sink: &'a dyn MetricsSink, name: &'static str) -> Self {
        Self {
            sink,
            name,
            started: Instant::now(),
        }
    }
}

impl Drop for MetricTimer<'_> {
    fn drop(&mut self) {
        self.sink.record(self.name, self.started.elapsed());
    }
}
