//! Thread lifecycle states and the per-state histogram.

use std::fmt;

const STATE_COUNT: usize = 8;

/// Scheduler state of one OS thread of this process.
///
/// The set is closed: every state the host reports maps onto exactly one
/// variant, unrecognised codes land in [`ThreadState::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThreadState {
    Running,
    Sleeping,
    /// Uninterruptible wait, usually on I/O.
    DiskWait,
    Stopped,
    Zombie,
    Idle,
    Dead,
    Other,
}

impl ThreadState {
    pub const ALL: [ThreadState; STATE_COUNT] = [
        ThreadState::Running,
        ThreadState::Sleeping,
        ThreadState::DiskWait,
        ThreadState::Stopped,
        ThreadState::Zombie,
        ThreadState::Idle,
        ThreadState::Dead,
        ThreadState::Other,
    ];

    /// Map a Linux `/proc/<pid>/task/<tid>/stat` state code.
    pub fn from_proc_code(code: char) -> Self {
        match code {
            'R' => Self::Running,
            'S' => Self::Sleeping,
            'D' => Self::DiskWait,
            'T' | 't' => Self::Stopped,
            'Z' => Self::Zombie,
            'I' => Self::Idle,
            'X' | 'x' => Self::Dead,
            _ => Self::Other,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::DiskWait => "disk-wait",
            Self::Stopped => "stopped",
            Self::Zombie => "zombie",
            Self::Idle => "idle",
            Self::Dead => "dead",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Count of threads per state. Every state is present, zeros included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadHistogram {
    counts: [usize; STATE_COUNT],
}

impl ThreadHistogram {
    pub fn from_states(states: &[ThreadState]) -> Self {
        let mut counts = [0usize; STATE_COUNT];
        for state in states {
            counts[state.index()] += 1;
        }
        Self { counts }
    }

    pub fn count(&self, state: ThreadState) -> usize {
        self.counts[state.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// `(state, count)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (ThreadState, usize)> + '_ {
        ThreadState::ALL.iter().map(|&s| (s, self.count(s)))
    }
}

impl fmt::Display for ThreadHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Threads: {}", self.total())?;
        for (state, count) in self.iter() {
            write!(f, " - {state}: {count}")?;
        }
        Ok(())
    }
}
