//! The periodic sampling task.
//!
//! # Architecture
//!
//! ```text
//! Sampler::start() ──► tokio task ──► every interval: tick() ──► DigestSink
//!                                       │
//!                                       └─► per section: spawn_blocking + timeout
//! SamplerHandle::stop() ──► watch shutdown ──► task exits, returns tick count
//! ```
//!
//! A section whose collector errors, panics or overruns the probe timeout is
//! replaced by a marker; the rest of the tick and all later ticks proceed.
//! A collector that overran its budget is not started again until the
//! abandoned run returns, so a hung source holds at most one blocking thread.
//! The counter snapshot lives inside the sampler, which `start` consumes, so
//! only one task ever updates it.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use pulse_core::config::{DEFAULT_PROBE_TIMEOUT_MS, SamplerConfig};
use pulse_core::delta::{self, CounterSnapshot};
use pulse_core::digest::{Digest, DigestSink, Section, SectionKind};
use pulse_core::error::{ProbeError, PulseError};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::sections::{self, Sources};

/// Collects one digest per tick from a set of [`Sources`].
pub struct Sampler {
    sources: Sources,
    sink: Arc<dyn DigestSink>,
    probe_timeout: Duration,
    max_ticks: Option<u64>,
    counters: CounterSnapshot,
    ticks: u64,
    stalled: HashMap<SectionKind, Stalled>,
}

/// A timed-out collector run that is still occupying a blocking thread.
struct Stalled {
    since_tick: u64,
    task: AbortHandle,
}

impl Sampler {
    pub fn new(sources: Sources, sink: Arc<dyn DigestSink>) -> Self {
        Self {
            sources,
            sink,
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            max_ticks: None,
            counters: CounterSnapshot::new(),
            ticks: 0,
            stalled: HashMap::new(),
        }
    }

    /// Apply the probe timeout and tick limit from config.
    pub fn with_config(self, config: &SamplerConfig) -> Self {
        let mut sampler = self.with_probe_timeout(config.effective_probe_timeout());
        sampler.max_ticks = config.max_ticks;
        sampler
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Stop on its own after `n` ticks.
    pub fn with_max_ticks(mut self, n: u64) -> Self {
        self.max_ticks = Some(n);
        self
    }

    /// Seed the delta tracker with a prior observation.
    pub fn with_counter_snapshot(mut self, snapshot: CounterSnapshot) -> Self {
        self.counters = snapshot;
        self
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn counter_snapshot(&self) -> &CounterSnapshot {
        &self.counters
    }

    /// Run every collector once and assemble the digest. Does not emit it.
    pub async fn tick(&mut self) -> Digest {
        self.ticks += 1;
        let started = Instant::now();
        let now = SystemTime::now();
        let mut digest = Digest::new(self.ticks);

        let src = self.sources.clone();
        let sessions = self.guarded(SectionKind::Sessions, move || sections::sessions(&src)).await;
        let session_snapshot = match sessions {
            Ok((lines, sessions)) => {
                digest.push(Section::lines(SectionKind::Sessions, lines));
                Some(sessions)
            }
            Err(e) => {
                digest.push(Section::failed(SectionKind::Sessions, e));
                None
            }
        };

        let src = self.sources.clone();
        let latency = self.guarded(SectionKind::Latency, move || sections::latency(&src)).await;
        digest.push(section(SectionKind::Latency, latency));

        let src = self.sources.clone();
        let subscribers = self
            .guarded(SectionKind::Subscribers, move || {
                let sessions = session_snapshot.unwrap_or_else(|| src.sessions.snapshot());
                sections::subscribers(now, &sessions)
            })
            .await;
        digest.push(section(SectionKind::Subscribers, subscribers));

        let host = self.sources.host.clone();
        let threads = self.guarded(SectionKind::Threads, move || sections::threads(host.as_ref())).await;
        digest.push(section(SectionKind::Threads, threads));

        let outbound = self.sources.outbound.clone();
        let backlog = self.guarded(SectionKind::Backlog, move || sections::backlog(outbound.as_ref())).await;
        digest.push(section(SectionKind::Backlog, backlog));

        let host = self.sources.host.clone();
        let samples = self.guarded(SectionKind::Counters, move || Ok(host.counters())).await;
        match samples {
            Ok(samples) => {
                let (lines, next) = delta::track(std::mem::take(&mut self.counters), samples);
                self.counters = next;
                let lines = lines.iter().map(ToString::to_string).collect();
                digest.push(Section::lines(SectionKind::Counters, lines));
            }
            Err(e) => digest.push(Section::failed(SectionKind::Counters, e)),
        }

        let host = self.sources.host.clone();
        let handles = self.guarded(SectionKind::Handles, move || sections::handles(host.as_ref())).await;
        digest.push(section(SectionKind::Handles, handles));

        let host = self.sources.host.clone();
        let closing = self.guarded(SectionKind::Closing, move || sections::closing(host.as_ref())).await;
        digest.push(section(SectionKind::Closing, closing));

        debug!("tick #{} collected in {:?}", self.ticks, started.elapsed());
        digest
    }

    /// Run `job` on the blocking pool, bounded by the probe timeout.
    ///
    /// Skipped while an earlier run of the same section is still blocked.
    async fn guarded<R, F>(&mut self, kind: SectionKind, job: F) -> Result<R, ProbeError>
    where
        F: FnOnce() -> Result<R, ProbeError> + Send + 'static,
        R: Send + 'static,
    {
        let result = match self.stalled_since(kind) {
            Some(since) => Err(ProbeError::Stalled(since)),
            None => {
                let mut task = tokio::task::spawn_blocking(job);
                match tokio::time::timeout(self.probe_timeout, &mut task).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(join)) => Err(ProbeError::Panicked(join_message(join))),
                    Err(_) => {
                        let stalled = Stalled { since_tick: self.ticks, task: task.abort_handle() };
                        self.stalled.insert(kind, stalled);
                        Err(ProbeError::Timeout(self.probe_timeout))
                    }
                }
            }
        };
        if let Err(e) = &result {
            warn!("[{kind}] probe failed on tick #{}: {e}", self.ticks);
        }
        result
    }

    /// Tick on which a still-running earlier run of `kind` was abandoned.
    fn stalled_since(&mut self, kind: SectionKind) -> Option<u64> {
        let stalled = self.stalled.get(&kind)?;
        if stalled.task.is_finished() {
            self.stalled.remove(&kind);
            return None;
        }
        Some(stalled.since_tick)
    }

    /// Spawn the sampling loop. The first digest is emitted one `interval`
    /// after start.
    pub fn start(self, interval: Duration) -> SamplerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(interval, shutdown_rx));
        SamplerHandle { shutdown_tx, task }
    }

    async fn run(mut self, interval: Duration, mut shutdown_rx: watch::Receiver<bool>) -> u64 {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // `interval` fires immediately once; consume it so the first digest
        // covers a full interval.
        ticker.tick().await;

        info!("sampler started (interval={interval:?}, probe_timeout={:?})", self.probe_timeout);

        loop {
            if let Some(max) = self.max_ticks
                && self.ticks >= max
            {
                info!("sampler reached {max} tick(s)");
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                // Also fires when the handle is dropped.
                _ = shutdown_rx.changed() => break,
            }
            if *shutdown_rx.borrow() {
                break;
            }

            let digest = self.tick().await;
            self.sink.emit(&digest);
        }

        info!("sampler stopped after {} tick(s)", self.ticks);
        self.ticks
    }
}

/// Handle to a running sampler task.
pub struct SamplerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl SamplerHandle {
    /// Signal shutdown and wait for the task. Returns the number of ticks run.
    pub async fn stop(self) -> Result<u64, PulseError> {
        let _ = self.shutdown_tx.send(true);
        self.task.await.map_err(|e| PulseError::Task(join_message(e)))
    }

    /// Wait for the task to end on its own (tick limit reached).
    pub async fn join(self) -> Result<u64, PulseError> {
        let SamplerHandle { shutdown_tx, task } = self;
        let ticks = task.await.map_err(|e| PulseError::Task(join_message(e)));
        drop(shutdown_tx);
        ticks
    }

    /// Run until `signal` resolves or the task ends on its own, whichever
    /// comes first, then shut down.
    pub async fn stop_on<F: Future>(self, signal: F) -> Result<u64, PulseError> {
        let SamplerHandle { shutdown_tx, mut task } = self;
        tokio::select! {
            res = &mut task => return res.map_err(|e| PulseError::Task(join_message(e))),
            _ = signal => {}
        }
        let _ = shutdown_tx.send(true);
        task.await.map_err(|e| PulseError::Task(join_message(e)))
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

fn section(kind: SectionKind, body: Result<Vec<String>, ProbeError>) -> Section {
    match body {
        Ok(lines) => Section::lines(kind, lines),
        Err(e) => Section::failed(kind, e),
    }
}

fn join_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "task cancelled".to_string();
    }
    match err.try_into_panic() {
        Ok(payload) => panic_text(payload.as_ref()),
        Err(err) => err.to_string(),
    }
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
