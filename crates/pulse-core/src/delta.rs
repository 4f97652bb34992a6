//! Per-interval deltas for monotonically increasing runtime counters.
//!
//! The tracker state is a plain [`CounterSnapshot`] value: it is passed into
//! [`track`] together with the current readings and the updated snapshot is
//! returned. Nothing is held in globals, so callers (and tests) control
//! exactly which prior observation a delta is computed against.
//!
//! A source with no prior entry is compared against `{0, 0}`, so the first
//! tick reports lifetime totals. A reading lower than the stored one means
//! the host counter was reset; the delta is clamped to zero and flagged.

use std::collections::HashMap;
use std::fmt;

use crate::error::ProbeError;

/// Absolute value of one counter source at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterReading {
    /// Number of events (collections, timeslices, ...).
    pub count: u64,
    /// Cumulative time spent in those events, milliseconds.
    pub time_ms: u64,
}

/// One source's reading for the current tick, possibly failed.
#[derive(Debug)]
pub struct CounterSample {
    pub name: String,
    pub reading: Result<CounterReading, ProbeError>,
}

/// Last observed absolute values, keyed by source name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    values: HashMap<String, CounterReading>,
}

impl CounterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<CounterReading> {
        self.values.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, reading: CounterReading) {
        self.values.insert(name.into(), reading);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Change of one source over the last interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delta {
    pub count: u64,
    pub time_ms: u64,
    /// The counter went backwards since the previous tick.
    pub reset: bool,
}

impl Delta {
    /// `current - previous`, clamped to zero and flagged on decrease.
    pub fn between(previous: CounterReading, current: CounterReading) -> Self {
        let reset = current.count < previous.count || current.time_ms < previous.time_ms;
        Self {
            count: current.count.saturating_sub(previous.count),
            time_ms: current.time_ms.saturating_sub(previous.time_ms),
            reset,
        }
    }
}

/// Outcome for one source on one tick.
#[derive(Debug)]
pub struct DeltaLine {
    pub name: String,
    pub delta: Result<Delta, ProbeError>,
}

impl fmt::Display for DeltaLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.delta {
            Ok(d) => {
                write!(f, "{}: {} collections - {}ms", self.name, d.count, d.time_ms)?;
                if d.reset {
                    f.write_str(" (counter reset)")?;
                }
                Ok(())
            }
            Err(e) => write!(f, "{}: probe failed: {e}", self.name),
        }
    }
}

/// Compute one delta per sample and return the snapshot to use next tick.
///
/// Successful readings overwrite the stored value with the *absolute*
/// reading. Failed readings leave the stored value untouched.
pub fn track(mut snapshot: CounterSnapshot, samples: Vec<CounterSample>) -> (Vec<DeltaLine>, CounterSnapshot) {
    let mut lines = Vec::with_capacity(samples.len());
    for sample in samples {
        let delta = match sample.reading {
            Ok(current) => {
                let previous = snapshot.get(&sample.name).unwrap_or_default();
                snapshot.insert(sample.name.clone(), current);
                Ok(Delta::between(previous, current))
            }
            Err(e) => Err(e),
        };
        lines.push(DeltaLine { name: sample.name, delta });
    }
    (lines, snapshot)
}
