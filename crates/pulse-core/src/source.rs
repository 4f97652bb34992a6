//! Read interfaces into state the sampler does not own.
//!
//! The session registry, connection registry, delay log and outbound buffer
//! belong to the hosting server; host introspection belongs to the OS. The
//! sampler only sees them through these traits. Every accessor must return a
//! point-in-time snapshot without blocking the serving paths for long.
//!
//! Host probes return [`Probe<T>`]: an `Err` is a probe failure, while
//! [`Capability::Unsupported`] is the normal answer on a platform that does
//! not expose the metric.

use std::collections::HashMap;

use crate::delta::{CounterReading, CounterSample};
use crate::error::ProbeError;
use crate::session::{ConnectionSnapshot, Session};
use crate::threads::ThreadState;

/// Result of a host capability probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Capability<T> {
    Available(T),
    Unsupported,
}

impl<T> Capability<T> {
    pub fn available(self) -> Option<T> {
        match self {
            Self::Available(v) => Some(v),
            Self::Unsupported => None,
        }
    }
}

pub type Probe<T> = Result<Capability<T>, ProbeError>;

/// Latencies recorded since the previous fetch, keyed by event category.
pub trait DelayLog: Send + Sync {
    /// Take the accumulated batch. A batch is returned exactly once.
    fn fetch_and_clear(&self) -> HashMap<String, Vec<u64>>;
}

/// Active sessions.
pub trait SessionRegistry: Send + Sync {
    fn snapshot(&self) -> Vec<Session>;
}

/// Open client connections, grouped by connection class.
pub trait ConnectionRegistry: Send + Sync {
    fn snapshot(&self) -> ConnectionSnapshot;
}

/// Fill level of the outbound broadcast channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferState {
    pub queued: usize,
    pub capacity: usize,
}

pub trait OutboundBuffer: Send + Sync {
    fn state(&self) -> BufferState;
}

/// A named monotonically increasing `{count, time}` counter.
pub trait CounterSource: Send + Sync {
    fn name(&self) -> &str;
    fn read(&self) -> Result<CounterReading, ProbeError>;
}

/// Process memory figures in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Resident set size.
    pub used: u64,
    /// Virtual memory reserved by the process.
    pub committed: u64,
    /// Physical memory of the host.
    pub max: u64,
}

/// Open file descriptors versus the soft limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleUsage {
    pub open: u64,
    pub max: u64,
}

/// Host runtime introspection.
pub trait HostRuntime: Send + Sync {
    /// One sample per counter source; failures are per source.
    fn counters(&self) -> Vec<CounterSample>;
    /// State of every live thread of this process.
    fn threads(&self) -> Probe<Vec<ThreadState>>;
    /// One-minute system load average.
    fn load_average(&self) -> Probe<f64>;
    /// Processing units available to this process.
    fn processors(&self) -> Probe<usize>;
    fn memory(&self) -> Probe<MemoryUsage>;
    fn open_handles(&self) -> Probe<HandleUsage>;
}
