//! End-to-end tests of the sampling loop against fake collaborators.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use pulse_core::delta::{CounterReading, CounterSample};
use pulse_core::digest::{Digest, DigestSink, SectionKind};
use pulse_core::error::ProbeError;
use pulse_core::registry::{ConnectionTable, DelayRecorder, SessionTable};
use pulse_core::session::ConnectionClass;
use pulse_core::source::{
    BufferState, Capability, HandleUsage, HostRuntime, MemoryUsage, OutboundBuffer, Probe, SessionRegistry,
};
use pulse_core::threads::ThreadState;
use pulse_sampler::{Sampler, Sources};

const MIB: u64 = 1024 * 1024;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Host whose counter readings advance by a fixed step every call.
struct FakeHost {
    calls: AtomicU64,
    supported: bool,
    fail_counters: bool,
}

impl FakeHost {
    fn linux_like() -> Self {
        Self { calls: AtomicU64::new(0), supported: true, fail_counters: false }
    }

    fn bare() -> Self {
        Self { calls: AtomicU64::new(0), supported: false, fail_counters: false }
    }
}

impl HostRuntime for FakeHost {
    fn counters(&self) -> Vec<CounterSample> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let reading = if self.fail_counters {
            Err(ProbeError::Source("collector offline".into()))
        } else {
            Ok(CounterReading { count: 3 * n, time_ms: 50 * n })
        };
        vec![CounterSample { name: "young".into(), reading }]
    }

    fn threads(&self) -> Probe<Vec<ThreadState>> {
        if !self.supported {
            return Ok(Capability::Unsupported);
        }
        Ok(Capability::Available(vec![ThreadState::Running, ThreadState::Sleeping, ThreadState::Sleeping]))
    }

    fn load_average(&self) -> Probe<f64> {
        if !self.supported {
            return Ok(Capability::Unsupported);
        }
        Ok(Capability::Available(1.0))
    }

    fn processors(&self) -> Probe<usize> {
        Ok(Capability::Available(4))
    }

    fn memory(&self) -> Probe<MemoryUsage> {
        Ok(Capability::Available(MemoryUsage { used: 10 * MIB, committed: 20 * MIB, max: 100 * MIB }))
    }

    fn open_handles(&self) -> Probe<HandleUsage> {
        if !self.supported {
            return Ok(Capability::Unsupported);
        }
        Ok(Capability::Available(HandleUsage { open: 10, max: 1000 }))
    }
}

struct FixedBuffer(BufferState);

impl OutboundBuffer for FixedBuffer {
    fn state(&self) -> BufferState {
        self.0
    }
}

struct PanickingSessions;

impl SessionRegistry for PanickingSessions {
    fn snapshot(&self) -> Vec<pulse_core::session::Session> {
        panic!("registry poisoned");
    }
}

struct SlowBuffer;

impl OutboundBuffer for SlowBuffer {
    fn state(&self) -> BufferState {
        std::thread::sleep(Duration::from_millis(500));
        BufferState { queued: 0, capacity: 1 }
    }
}

/// Blocks every caller until released.
#[derive(Default)]
struct HungBuffer {
    calls: AtomicUsize,
    released: AtomicBool,
}

impl OutboundBuffer for HungBuffer {
    fn state(&self) -> BufferState {
        self.calls.fetch_add(1, Ordering::SeqCst);
        while !self.released.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(5));
        }
        BufferState { queued: 1, capacity: 8 }
    }
}

#[derive(Default)]
struct CollectingSink {
    digests: Mutex<Vec<Vec<String>>>,
}

impl DigestSink for CollectingSink {
    fn emit(&self, digest: &Digest) {
        self.digests.lock().push(digest.lines());
    }
}

struct Fixture {
    delays: Arc<DelayRecorder>,
    sessions: Arc<SessionTable>,
    connections: Arc<ConnectionTable>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            delays: Arc::new(DelayRecorder::new()),
            sessions: Arc::new(SessionTable::new()),
            connections: Arc::new(ConnectionTable::new()),
        }
    }

    fn sources(&self, host: FakeHost) -> Sources {
        Sources::new(
            self.delays.clone(),
            self.sessions.clone(),
            self.connections.clone(),
            Arc::new(FixedBuffer(BufferState { queued: 3, capacity: 64 })),
            Arc::new(host),
        )
    }
}

fn sampler(sources: Sources) -> Sampler {
    Sampler::new(sources, Arc::new(CollectingSink::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_digest_in_order() {
    let fx = Fixture::new();
    let now = SystemTime::now();
    fx.sessions.open("g1", now - Duration::from_secs(4 * 60));
    fx.sessions.update("g1", |s| {
        s.participants = 2;
        s.observers = 1;
        s.subscribed_for_updates = true;
    });
    fx.sessions.open("g2", now);
    fx.connections.connect(ConnectionClass::Persistent, "alice");
    fx.connections.connect(ConnectionClass::Persistent, "alice");
    fx.connections.connect(ConnectionClass::Polling, "bob");
    for v in [10, 20, 30, 40, 50] {
        fx.delays.record("join", v);
    }

    let mut s = sampler(fx.sources(FakeHost::linux_like()));
    let digest = s.tick().await;

    let kinds: Vec<SectionKind> = digest.sections.iter().map(|sec| sec.kind).collect();
    assert_eq!(kinds, SectionKind::ALL.to_vec());

    assert_eq!(
        digest.lines(),
        vec![
            "Sessions: 2 - Participants: 2 - Observers: 1 - Subscribed: 1 \
             - persistent: 1 users / 2 connections - polling: 1 users / 1 connections",
            "join: Average: 30ms - Count: 5 - Percentiles (5/25/50/75/95): 10ms/20ms/30ms/40ms/50ms",
            "Subscribed sessions: 1 - Average age: 4min - Oldest: 4min",
            "Threads: 3 - running: 1 - sleeping: 2 - disk-wait: 0 - stopped: 0 - zombie: 0 - idle: 0 - dead: 0 - other: 0",
            "Outbound buffer: 3 / 64",
            "young: 3 collections - 50ms",
            "Open file descriptors: 1.0% (10 / 1000)",
            "Load: 25% - Memory: used 10MiB / committed 20MiB / max 100MiB",
        ]
    );
}

#[tokio::test]
async fn empty_category_reports_no_data() {
    let fx = Fixture::new();
    fx.delays.register("join");
    let mut s = sampler(fx.sources(FakeHost::linux_like()));

    let digest = s.tick().await;
    let lines = digest.lines();
    assert!(lines.contains(&"join: no data".to_string()));
}

#[tokio::test]
async fn delay_batch_is_consumed_once() {
    let fx = Fixture::new();
    fx.delays.record("move", 7);
    let mut s = sampler(fx.sources(FakeHost::linux_like()));

    let first = s.tick().await;
    assert!(first.lines().iter().any(|l| l.starts_with("move: Average: 7ms")));

    let second = s.tick().await;
    assert!(second.lines().iter().all(|l| !l.starts_with("move:")));
}

#[tokio::test]
async fn counter_deltas_across_ticks() {
    let fx = Fixture::new();
    let mut s = sampler(fx.sources(FakeHost::linux_like()));

    let first = s.tick().await;
    assert!(first.lines().contains(&"young: 3 collections - 50ms".to_string()));
    let second = s.tick().await;
    assert!(second.lines().contains(&"young: 3 collections - 50ms".to_string()));
    assert_eq!(s.counter_snapshot().get("young"), Some(CounterReading { count: 6, time_ms: 100 }));
}

#[tokio::test]
async fn failed_counter_leaves_snapshot() {
    let fx = Fixture::new();
    let mut host = FakeHost::linux_like();
    host.fail_counters = true;
    let mut s = sampler(fx.sources(host));

    let digest = s.tick().await;
    assert!(digest.lines().contains(&"young: probe failed: collector offline".to_string()));
    assert!(s.counter_snapshot().is_empty());
}

#[tokio::test]
async fn unsupported_platform_is_informational() {
    let fx = Fixture::new();
    let mut s = sampler(fx.sources(FakeHost::bare()));

    let digest = s.tick().await;
    assert!(digest.sections.iter().all(|sec| !sec.is_failed()));
    let lines = digest.lines();
    assert!(lines.contains(&"Threads: unsupported on this platform".to_string()));
    assert!(lines.contains(&"Open file descriptors: unsupported on this platform".to_string()));
    assert!(lines.iter().any(|l| l.starts_with("Load: unsupported on this platform - Memory: used 10MiB")));
}

#[tokio::test]
async fn panicking_probe_is_isolated() {
    let fx = Fixture::new();
    let mut sources = fx.sources(FakeHost::linux_like());
    sources.sessions = Arc::new(PanickingSessions);
    let mut s = sampler(sources);

    let digest = s.tick().await;
    let sessions = digest.section(SectionKind::Sessions).unwrap();
    assert!(matches!(&sessions.body, Err(ProbeError::Panicked(msg)) if msg.contains("registry poisoned")));
    // The subscriber section re-reads the registry and fails the same way.
    assert!(digest.section(SectionKind::Subscribers).unwrap().is_failed());

    let lines = digest.lines();
    assert!(lines[0].starts_with("[sessions] probe failed: panicked"));
    assert!(lines.contains(&"Outbound buffer: 3 / 64".to_string()));
    assert!(lines.contains(&"young: 3 collections - 50ms".to_string()));
}

#[tokio::test]
async fn slow_probe_times_out() {
    let fx = Fixture::new();
    let mut sources = fx.sources(FakeHost::linux_like());
    sources.outbound = Arc::new(SlowBuffer);
    let mut s = sampler(sources).with_probe_timeout(Duration::from_millis(50));

    let digest = s.tick().await;
    let backlog = digest.section(SectionKind::Backlog).unwrap();
    assert!(matches!(backlog.body, Err(ProbeError::Timeout(_))));
    assert!(!digest.section(SectionKind::Handles).unwrap().is_failed());
}

#[tokio::test]
async fn hung_source_is_not_restarted() {
    let fx = Fixture::new();
    let hung = Arc::new(HungBuffer::default());
    let mut sources = fx.sources(FakeHost::linux_like());
    sources.outbound = hung.clone();
    let mut s = sampler(sources).with_probe_timeout(Duration::from_millis(30));

    let first = s.tick().await;
    assert!(matches!(first.section(SectionKind::Backlog).unwrap().body, Err(ProbeError::Timeout(_))));

    for _ in 0..5 {
        let digest = s.tick().await;
        let backlog = digest.section(SectionKind::Backlog).unwrap();
        assert!(matches!(backlog.body, Err(ProbeError::Stalled(1))));
        assert!(digest.lines().contains(&"[backlog] probe failed: still running since tick #1".to_string()));
        assert!(!digest.section(SectionKind::Handles).unwrap().is_failed());
    }
    assert_eq!(hung.calls.load(Ordering::SeqCst), 1);

    hung.released.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let recovered = s.tick().await;
    assert!(recovered.lines().contains(&"Outbound buffer: 1 / 8".to_string()));
    assert_eq!(hung.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn loop_runs_until_max_ticks() {
    let fx = Fixture::new();
    let sink = Arc::new(CollectingSink::default());
    let handle = Sampler::new(fx.sources(FakeHost::linux_like()), sink.clone())
        .with_max_ticks(3)
        .start(Duration::from_millis(10));

    let ticks = tokio::time::timeout(Duration::from_secs(5), handle.join()).await.unwrap().unwrap();
    assert_eq!(ticks, 3);
    assert_eq!(sink.digests.lock().len(), 3);
}

#[tokio::test]
async fn zero_tick_limit_emits_nothing() {
    let fx = Fixture::new();
    let sink = Arc::new(CollectingSink::default());
    let handle = Sampler::new(fx.sources(FakeHost::linux_like()), sink.clone())
        .with_max_ticks(0)
        .start(Duration::from_millis(10));

    let ticks = tokio::time::timeout(Duration::from_secs(5), handle.join()).await.unwrap().unwrap();
    assert_eq!(ticks, 0);
    assert!(sink.digests.lock().is_empty());
}

#[tokio::test]
async fn loop_survives_failures_and_stops_on_signal() {
    let fx = Fixture::new();
    let mut sources = fx.sources(FakeHost::linux_like());
    sources.sessions = Arc::new(PanickingSessions);
    let sink = Arc::new(CollectingSink::default());
    let handle = Sampler::new(sources, sink.clone()).start(Duration::from_millis(10));

    tokio::time::timeout(Duration::from_secs(5), async {
        while sink.digests.lock().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let ticks = handle.stop().await.unwrap();
    assert!(ticks >= 2);
    let emitted = sink.digests.lock().len() as u64;
    assert_eq!(emitted, ticks);
}

#[tokio::test]
async fn seeded_snapshot_is_used() {
    let fx = Fixture::new();
    let mut prior = pulse_core::delta::CounterSnapshot::new();
    prior.insert("young", CounterReading { count: 1, time_ms: 20 });
    let mut s = sampler(fx.sources(FakeHost::linux_like())).with_counter_snapshot(prior);

    let digest = s.tick().await;
    assert!(digest.lines().contains(&"young: 2 collections - 30ms".to_string()));
}

#[test]
fn connection_snapshot_shape() {
    use pulse_core::source::ConnectionRegistry;

    let table = ConnectionTable::new();
    table.connect(ConnectionClass::Polling, "x");
    let snap: HashMap<ConnectionClass, Vec<(String, u32)>> = table.snapshot();
    assert_eq!(snap[&ConnectionClass::Polling], vec![("x".to_string(), 1)]);
}

#[tokio::test]
async fn stop_on_signal_or_limit() {
    let fx = Fixture::new();
    let handle = sampler(fx.sources(FakeHost::linux_like())).with_max_ticks(2).start(Duration::from_millis(10));
    let ticks = handle.stop_on(std::future::pending::<()>()).await.unwrap();
    assert_eq!(ticks, 2);

    let handle = sampler(fx.sources(FakeHost::linux_like())).start(Duration::from_secs(3600));
    let ticks = handle.stop_on(async {}).await.unwrap();
    assert_eq!(ticks, 0);
}
