//! The multi-section text record emitted once per tick.

use std::fmt;

use tracing::info;

use crate::error::ProbeError;
use crate::logging::DIGEST_TARGET;

/// Digest sections, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    Sessions,
    Latency,
    Subscribers,
    Threads,
    Backlog,
    Counters,
    Handles,
    Closing,
}

impl SectionKind {
    pub const ALL: [SectionKind; 8] = [
        SectionKind::Sessions,
        SectionKind::Latency,
        SectionKind::Subscribers,
        SectionKind::Threads,
        SectionKind::Backlog,
        SectionKind::Counters,
        SectionKind::Handles,
        SectionKind::Closing,
    ];
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sessions => "sessions",
            Self::Latency => "latency",
            Self::Subscribers => "subscribers",
            Self::Threads => "threads",
            Self::Backlog => "backlog",
            Self::Counters => "counters",
            Self::Handles => "handles",
            Self::Closing => "closing",
        };
        f.write_str(s)
    }
}

/// Body of one section: its lines, or the reason the probe failed.
#[derive(Debug)]
pub struct Section {
    pub kind: SectionKind,
    pub body: Result<Vec<String>, ProbeError>,
}

impl Section {
    pub fn lines(kind: SectionKind, lines: Vec<String>) -> Self {
        Self { kind, body: Ok(lines) }
    }

    pub fn failed(kind: SectionKind, error: ProbeError) -> Self {
        Self { kind, body: Err(error) }
    }

    pub fn is_failed(&self) -> bool {
        self.body.is_err()
    }
}

/// Everything one tick produced.
#[derive(Debug, Default)]
pub struct Digest {
    pub tick: u64,
    pub sections: Vec<Section>,
}

impl Digest {
    pub fn new(tick: u64) -> Self {
        Self { tick, sections: Vec::with_capacity(SectionKind::ALL.len()) }
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Rendered lines, failed sections replaced by a marker line.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        for section in &self.sections {
            match &section.body {
                Ok(lines) => out.extend(lines.iter().cloned()),
                Err(e) => out.push(format!("[{}] probe failed: {e}", section.kind)),
            }
        }
        out
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pulse digest #{}", self.tick)?;
        for line in self.lines() {
            write!(f, "\n  {line}")?;
        }
        Ok(())
    }
}

/// Receiver of finished digests.
pub trait DigestSink: Send + Sync {
    fn emit(&self, digest: &Digest);
}

/// Writes each digest as one `info` event on [`DIGEST_TARGET`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DigestSink for TracingSink {
    fn emit(&self, digest: &Digest) {
        info!(target: DIGEST_TARGET, "{digest}");
    }
}
