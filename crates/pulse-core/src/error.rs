//! Typed error definitions for the pulse sampler.
//!
//! [`PulseError`] covers setup problems (bad configuration). [`ProbeError`] is
//! the failure of a single metric source during a tick; it is never fatal and
//! ends up as a marker line in that tick's digest. Both implement
//! `std::error::Error` via `thiserror`, so they compose with `anyhow::Result`.

use std::time::Duration;

use thiserror::Error;

/// Setup and configuration errors.
#[derive(Debug, Error)]
pub enum PulseError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// The sampler task could not be joined cleanly.
    #[error("sampler task error: {0}")]
    Task(String),
}

/// Failure of one probe during one tick.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Reading a host file (procfs etc.) failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Host data was readable but malformed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The probe did not finish within its budget.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// A previous run of this probe timed out and has not returned yet.
    #[error("still running since tick #{0}")]
    Stalled(u64),

    /// The probe panicked.
    #[error("panicked: {0}")]
    Panicked(String),

    /// An externally supplied source reported an error.
    #[error("{0}")]
    Source(String),
}
