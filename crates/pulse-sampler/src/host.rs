//! Host runtime probes for the current process.
//!
//! On Linux the thread states, open descriptors and scheduler counters come
//! from procfs, the descriptor limit and load average from libc, and memory
//! figures from `sysinfo`. Anything the platform cannot answer is reported as
//! [`Capability::Unsupported`] rather than as an error.

use std::sync::Arc;

use parking_lot::Mutex;
use pulse_core::delta::{CounterReading, CounterSample};
use pulse_core::error::ProbeError;
use pulse_core::source::{Capability, CounterSource, HandleUsage, HostRuntime, MemoryUsage, Probe};
use pulse_core::threads::ThreadState;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::warn;

/// [`HostRuntime`] for the process the sampler runs in.
pub struct ProcessHost {
    system: Mutex<System>,
    pid: Option<Pid>,
    counters: Vec<Arc<dyn CounterSource>>,
}

impl ProcessHost {
    /// Probe the current process. Registers the scheduler counter on Linux.
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!("current pid unavailable, memory probe disabled: {e}");
                None
            }
        };
        let mut counters: Vec<Arc<dyn CounterSource>> = Vec::new();
        if cfg!(target_os = "linux") {
            counters.push(Arc::new(SchedStat));
        }
        Self { system: Mutex::new(System::new()), pid, counters }
    }

    /// Add a counter source reported in the per-source delta lines.
    pub fn with_counter(mut self, source: Arc<dyn CounterSource>) -> Self {
        self.counters.push(source);
        self
    }

    pub fn counter_names(&self) -> Vec<String> {
        self.counters.iter().map(|c| c.name().to_string()).collect()
    }
}

impl Default for ProcessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRuntime for ProcessHost {
    fn counters(&self) -> Vec<CounterSample> {
        self.counters
            .iter()
            .map(|source| CounterSample { name: source.name().to_string(), reading: source.read() })
            .collect()
    }

    fn threads(&self) -> Probe<Vec<ThreadState>> {
        thread_states()
    }

    fn load_average(&self) -> Probe<f64> {
        load_average()
    }

    fn processors(&self) -> Probe<usize> {
        let n = std::thread::available_parallelism()?;
        Ok(Capability::Available(n.get()))
    }

    fn memory(&self) -> Probe<MemoryUsage> {
        let Some(pid) = self.pid else {
            return Ok(Capability::Unsupported);
        };
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Ok(Capability::Unsupported);
        }
        let mut sys = self.system.lock();
        sys.refresh_memory();
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let max = sys.total_memory();
        let process = sys.process(pid).ok_or_else(|| ProbeError::Source(format!("process {pid} not found")))?;
        Ok(Capability::Available(MemoryUsage { used: process.memory(), committed: process.virtual_memory(), max }))
    }

    fn open_handles(&self) -> Probe<HandleUsage> {
        open_handles()
    }
}

// ---------------------------------------------------------------------------
// Scheduler counter
// ---------------------------------------------------------------------------

/// Timeslices and on-CPU time of this process (`/proc/self/schedstat`).
pub struct SchedStat;

impl CounterSource for SchedStat {
    fn name(&self) -> &str {
        "scheduler"
    }

    fn read(&self) -> Result<CounterReading, ProbeError> {
        let raw = std::fs::read_to_string("/proc/self/schedstat")?;
        parse_schedstat(&raw)
    }
}

/// `<run ns> <wait ns> <timeslices>` → `{count: timeslices, time_ms: run}`.
pub fn parse_schedstat(raw: &str) -> Result<CounterReading, ProbeError> {
    let fields: Vec<u64> = raw
        .split_whitespace()
        .map(|f| f.parse::<u64>().map_err(|e| ProbeError::Parse(format!("schedstat field {f:?}: {e}"))))
        .collect::<Result<_, _>>()?;
    match fields.as_slice() {
        [run_ns, _wait_ns, timeslices, ..] => Ok(CounterReading { count: *timeslices, time_ms: run_ns / 1_000_000 }),
        _ => Err(ProbeError::Parse(format!("schedstat has {} fields, expected 3", fields.len()))),
    }
}

// ---------------------------------------------------------------------------
// Threads
// ---------------------------------------------------------------------------

/// State code of a `/proc/<pid>/task/<tid>/stat` line.
///
/// The command name in parentheses may itself contain spaces or `)`, so the
/// state is the first field after the *last* `)`.
pub fn parse_stat_state(stat: &str) -> Result<ThreadState, ProbeError> {
    let rest = stat
        .rfind(')')
        .map(|i| &stat[i + 1..])
        .ok_or_else(|| ProbeError::Parse("stat line without command field".into()))?;
    rest.split_whitespace()
        .next()
        .and_then(|field| field.chars().next())
        .map(ThreadState::from_proc_code)
        .ok_or_else(|| ProbeError::Parse("stat line without state field".into()))
}

#[cfg(target_os = "linux")]
fn thread_states() -> Probe<Vec<ThreadState>> {
    use std::io::ErrorKind;

    let mut states = Vec::new();
    for entry in std::fs::read_dir("/proc/self/task")? {
        let path = entry?.path().join("stat");
        match std::fs::read_to_string(&path) {
            Ok(stat) => states.push(parse_stat_state(&stat)?),
            // Thread exited between listing and reading.
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Capability::Available(states))
}

#[cfg(not(target_os = "linux"))]
fn thread_states() -> Probe<Vec<ThreadState>> {
    Ok(Capability::Unsupported)
}

// ---------------------------------------------------------------------------
// Load average
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn load_average() -> Probe<f64> {
    let mut values = [0.0_f64; 1];
    // SAFETY: `getloadavg` writes at most `n` doubles into a valid buffer.
    let n = unsafe { libc::getloadavg(values.as_mut_ptr(), 1) };
    if n < 1 {
        return Err(ProbeError::Source("getloadavg returned no samples".into()));
    }
    Ok(Capability::Available(values[0]))
}

#[cfg(not(unix))]
fn load_average() -> Probe<f64> {
    Ok(Capability::Unsupported)
}

// ---------------------------------------------------------------------------
// Open descriptors
// ---------------------------------------------------------------------------

#[cfg(target_os = "linux")]
fn open_handles() -> Probe<HandleUsage> {
    let open = std::fs::read_dir("/proc/self/fd")?.count() as u64;

    let mut limit = libc::rlimit { rlim_cur: 0, rlim_max: 0 };
    // SAFETY: RLIMIT_NOFILE is a valid resource and `limit` is a valid out pointer.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    let max = if limit.rlim_cur == libc::RLIM_INFINITY { 0 } else { limit.rlim_cur as u64 };
    Ok(Capability::Available(HandleUsage { open, max }))
}

#[cfg(not(target_os = "linux"))]
fn open_handles() -> Probe<HandleUsage> {
    Ok(Capability::Unsupported)
}
