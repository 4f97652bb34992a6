//! # pulse-core
//!
//! Core crate for the pulse runtime sampler, providing:
//!
//! - **Percentiles** (`percentile`) — nearest-rank lookup over raw samples
//! - **Delay reporter** (`delay`) — per-category latency summaries
//! - **Delta tracker** (`delta`) — per-interval deltas of monotonic counters
//! - **Session metrics** (`session`) — session/connection counts and ages
//! - **Thread states** (`threads`) — closed state enum + histogram
//! - **Resources** (`resources`) — load, memory, handle and backlog lines
//! - **Sources** (`source`) — read interfaces into externally owned state
//! - **Digest** (`digest`) — per-tick record and its sinks
//! - **Registry** (`registry`) — in-memory collaborator implementations
//! - **Configuration** (`config`) — JSON config deserialization
//! - **Error types** (`error`) — `PulseError` / `ProbeError` via thiserror
//! - **Logging** (`logging`) — tracing-based structured logging

pub mod config;
pub mod delay;
pub mod delta;
pub mod digest;
pub mod error;
pub mod logging;
pub mod percentile;
pub mod registry;
pub mod resources;
pub mod session;
pub mod source;
pub mod threads;

pub use digest::{Digest, DigestSink, Section, SectionKind, TracingSink};
pub use error::{ProbeError, PulseError};
pub use source::{Capability, Probe};
