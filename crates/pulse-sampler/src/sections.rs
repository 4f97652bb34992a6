//! Collectors for each digest section.
//!
//! Every function here reads its sources and renders lines. They run on the
//! blocking pool inside the sampler's failure guard, so they may take locks
//! or touch the filesystem, and a panic only loses their own section.

use std::sync::Arc;
use std::time::SystemTime;

use pulse_core::delay;
use pulse_core::error::ProbeError;
use pulse_core::resources::{self, UNSUPPORTED};
use pulse_core::session::{self, Session, SessionMetrics};
use pulse_core::source::{
    Capability, ConnectionRegistry, DelayLog, HostRuntime, OutboundBuffer, SessionRegistry,
};
use pulse_core::threads::ThreadHistogram;

/// Everything a tick reads from.
#[derive(Clone)]
pub struct Sources {
    pub delay_log: Arc<dyn DelayLog>,
    pub sessions: Arc<dyn SessionRegistry>,
    pub connections: Arc<dyn ConnectionRegistry>,
    pub outbound: Arc<dyn OutboundBuffer>,
    pub host: Arc<dyn HostRuntime>,
}

impl Sources {
    pub fn new(
        delay_log: Arc<dyn DelayLog>,
        sessions: Arc<dyn SessionRegistry>,
        connections: Arc<dyn ConnectionRegistry>,
        outbound: Arc<dyn OutboundBuffer>,
        host: Arc<dyn HostRuntime>,
    ) -> Self {
        Self { delay_log, sessions, connections, outbound, host }
    }
}

/// Session/connection summary. Also returns the session snapshot so the
/// subscriber section of the same tick sees the same sessions.
pub fn sessions(src: &Sources) -> Result<(Vec<String>, Vec<Session>), ProbeError> {
    let sessions = src.sessions.snapshot();
    let connections = src.connections.snapshot();
    let metrics = SessionMetrics::collect(&sessions, &connections);
    Ok((vec![metrics.to_string()], sessions))
}

/// One line per delay-log category. Consumes the pending batch.
pub fn latency(src: &Sources) -> Result<Vec<String>, ProbeError> {
    let batch = src.delay_log.fetch_and_clear();
    Ok(delay::report(&batch))
}

/// Age of sessions with live update subscriptions.
pub fn subscribers(now: SystemTime, sessions: &[Session]) -> Result<Vec<String>, ProbeError> {
    Ok(vec![session::subscriber_detail(now, sessions)])
}

pub fn threads(host: &dyn HostRuntime) -> Result<Vec<String>, ProbeError> {
    let line = match host.threads()? {
        Capability::Available(states) => ThreadHistogram::from_states(&states).to_string(),
        Capability::Unsupported => format!("Threads: {UNSUPPORTED}"),
    };
    Ok(vec![line])
}

pub fn backlog(buffer: &dyn OutboundBuffer) -> Result<Vec<String>, ProbeError> {
    Ok(vec![resources::format_backlog(buffer.state())])
}

pub fn handles(host: &dyn HostRuntime) -> Result<Vec<String>, ProbeError> {
    Ok(vec![resources::format_handles(host.open_handles()?)])
}

/// `Load: NN% - Memory: ...`. A failing half is marked in place so the
/// other half is still reported.
pub fn closing(host: &dyn HostRuntime) -> Result<Vec<String>, ProbeError> {
    let load = match (host.load_average(), host.processors()) {
        (Ok(Capability::Available(avg)), Ok(Capability::Available(cpus))) => {
            resources::format_load(Capability::Available((avg, cpus)))
        }
        (Err(e), _) | (_, Err(e)) => format!("Load: probe failed: {e}"),
        _ => resources::format_load(Capability::Unsupported),
    };
    let memory = match host.memory() {
        Ok(m) => resources::format_memory(m),
        Err(e) => format!("Memory: probe failed: {e}"),
    };
    Ok(vec![format!("{load} - {memory}")])
}
