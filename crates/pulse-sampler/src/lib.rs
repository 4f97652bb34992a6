//! # pulse-sampler
//!
//! The periodic sampling task and the host-side probes it reads.
//!
//! ## Architecture
//!
//! A [`sampler::Sampler`] owns a [`sections::Sources`] bundle (the server's
//! registries plus a [`pulse_core::source::HostRuntime`]) and a
//! [`pulse_core::DigestSink`]. Each tick runs the section collectors in a
//! fixed order, isolates their failures, and hands one digest to the sink.
//!
//! ## Shared infrastructure
//!
//! - [`sampler`] — scheduling loop, failure guard, stop handle
//! - [`sections`] — one collector per digest section
//! - [`host`] — procfs / libc / sysinfo probes for the current process
//! - [`buffer`] — backlog views over tokio channels

pub mod buffer;
pub mod host;
pub mod sampler;
pub mod sections;

pub use sampler::{Sampler, SamplerHandle};
pub use sections::Sources;
