//! In-memory implementations of the collaborator interfaces.
//!
//! A server that has no registries of its own can record into these and hand
//! them to the sampler. Each lock is held only long enough to copy or swap the
//! underlying collection.

use std::collections::HashMap;
use std::time::SystemTime;

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::session::{ConnectionClass, ConnectionSnapshot, Session};
use crate::source::{ConnectionRegistry, DelayLog, SessionRegistry};

/// Accumulates latencies per category until the next fetch.
#[derive(Debug, Default)]
pub struct DelayRecorder {
    pending: Mutex<HashMap<String, Vec<u64>>>,
}

impl DelayRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one latency sample for `category`.
    pub fn record(&self, category: &str, latency_ms: u64) {
        let mut pending = self.pending.lock();
        match pending.get_mut(category) {
            Some(samples) => samples.push(latency_ms),
            None => {
                pending.insert(category.to_string(), vec![latency_ms]);
            }
        }
    }

    /// Make `category` appear in the next batch even without samples.
    pub fn register(&self, category: &str) {
        self.pending.lock().entry(category.to_string()).or_default();
    }
}

impl DelayLog for DelayRecorder {
    fn fetch_and_clear(&self) -> HashMap<String, Vec<u64>> {
        std::mem::take(&mut *self.pending.lock())
    }
}

/// Active sessions keyed by id.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: Mutex<AHashMap<String, Session>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, id: &str, started: SystemTime) {
        let session = Session {
            id: id.to_string(),
            started,
            participants: 0,
            observers: 0,
            subscribed_for_updates: false,
        };
        self.sessions.lock().insert(id.to_string(), session);
    }

    /// Apply `f` to the session, if it exists. Returns whether it did.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut Session)) -> bool {
        match self.sessions.lock().get_mut(id) {
            Some(session) => {
                f(session);
                true
            }
            None => false,
        }
    }

    pub fn close(&self, id: &str) -> Option<Session> {
        self.sessions.lock().remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

impl SessionRegistry for SessionTable {
    fn snapshot(&self) -> Vec<Session> {
        self.sessions.lock().values().cloned().collect()
    }
}

/// Open connections per class and uid.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    classes: Mutex<AHashMap<ConnectionClass, AHashMap<String, u32>>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, class: ConnectionClass, uid: &str) {
        let mut classes = self.classes.lock();
        *classes.entry(class).or_default().entry(uid.to_string()).or_insert(0) += 1;
    }

    /// Drop one connection; the uid disappears with its last connection.
    pub fn disconnect(&self, class: ConnectionClass, uid: &str) {
        let mut classes = self.classes.lock();
        if let Some(uids) = classes.get_mut(&class)
            && let Some(count) = uids.get_mut(uid)
        {
            *count = count.saturating_sub(1);
            if *count == 0 {
                uids.remove(uid);
            }
        }
    }
}

impl ConnectionRegistry for ConnectionTable {
    fn snapshot(&self) -> ConnectionSnapshot {
        self.classes
            .lock()
            .iter()
            .map(|(class, uids)| (*class, uids.iter().map(|(uid, n)| (uid.clone(), *n)).collect()))
            .collect()
    }
}
