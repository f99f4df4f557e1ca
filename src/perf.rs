//! Timing utilities for pipeline instrumentation

use std::time::{Duration, Instant};

/// A simple stopwatch for measuring stage durations
///
/// The controller records one split per pipeline stage and logs the
/// summary when a job reaches a terminal state.
#[derive(Debug)]
pub struct Stopwatch {
    start: Instant,
    last_split: Instant,
    splits: Vec<(&'static str, Duration)>,
}

impl Stopwatch {
    /// Start a new stopwatch
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_split: now,
            splits: Vec::new(),
        }
    }

    /// Record the duration since the previous split under a label
    pub fn split(&mut self, label: &'static str) {
        let now = Instant::now();
        self.splits.push((label, now - self.last_split));
        self.last_split = now;
    }

    /// Elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time since start in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// All recorded splits
    pub fn splits(&self) -> &[(&'static str, Duration)] {
        &self.splits
    }

    /// One-line summary of the splits for logging
    pub fn summary(&self) -> String {
        self.splits
            .iter()
            .map(|(label, d)| format!("{}: {}ms", label, d.as_millis()))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
