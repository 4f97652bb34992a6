//! Rendering of host resource probes into digest lines.

use crate::source::{BufferState, Capability, HandleUsage, MemoryUsage};

/// Rendering of a probe the platform does not provide.
pub const UNSUPPORTED: &str = "unsupported on this platform";

const MIB: u64 = 1024 * 1024;

/// `round(100 * load / processors)`. Zero processors count as one.
pub fn load_ratio(load_average: f64, processors: usize) -> u64 {
    let ratio = 100.0 * load_average / processors.max(1) as f64;
    if ratio.is_finite() && ratio > 0.0 { ratio.round() as u64 } else { 0 }
}

/// `Load: NN%`, or the unsupported marker.
pub fn format_load(load: Capability<(f64, usize)>) -> String {
    match load {
        Capability::Available((avg, cpus)) => format!("Load: {}%", load_ratio(avg, cpus)),
        Capability::Unsupported => format!("Load: {UNSUPPORTED}"),
    }
}

/// Memory figures in MiB.
pub fn format_memory(memory: Capability<MemoryUsage>) -> String {
    match memory {
        Capability::Available(m) => format!(
            "Memory: used {}MiB / committed {}MiB / max {}MiB",
            m.used / MIB,
            m.committed / MIB,
            m.max / MIB
        ),
        Capability::Unsupported => format!("Memory: {UNSUPPORTED}"),
    }
}

/// `open / max` as a percentage with one decimal.
pub fn format_handles(handles: Capability<HandleUsage>) -> String {
    match handles {
        Capability::Available(HandleUsage { open, max }) if max > 0 => {
            let pct = open as f64 * 100.0 / max as f64;
            format!("Open file descriptors: {pct:.1}% ({open} / {max})")
        }
        Capability::Available(HandleUsage { open, .. }) => {
            format!("Open file descriptors: {open} (no limit)")
        }
        Capability::Unsupported => format!("Open file descriptors: {UNSUPPORTED}"),
    }
}

/// `Outbound buffer: <used> / <capacity>`.
pub fn format_backlog(state: BufferState) -> String {
    format!("Outbound buffer: {} / {}", state.queued, state.capacity)
}
