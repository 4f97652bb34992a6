//! Session and connection counts derived from registry snapshots.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, SystemTime};

use ahash::AHashSet;

/// One active session (lobby / game) as seen by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    /// When the session (and its update subscription) was created.
    pub started: SystemTime,
    pub participants: u32,
    pub observers: u32,
    /// Whether someone subscribed to live updates of this session.
    pub subscribed_for_updates: bool,
}

/// Transport class of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConnectionClass {
    /// Long-lived socket (WebSocket).
    Persistent,
    /// Repeated request/response polling.
    Polling,
}

impl ConnectionClass {
    pub const ALL: [ConnectionClass; 2] = [ConnectionClass::Persistent, ConnectionClass::Polling];
}

impl fmt::Display for ConnectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persistent => write!(f, "persistent"),
            Self::Polling => write!(f, "polling"),
        }
    }
}

/// Point-in-time connection registry: class -> `(uid, open connections)`.
pub type ConnectionSnapshot = HashMap<ConnectionClass, Vec<(String, u32)>>;

/// Whole minutes elapsed from `timestamp` to `now`; 0 for future timestamps.
pub fn age_minutes(now: SystemTime, timestamp: SystemTime) -> u64 {
    now.duration_since(timestamp).unwrap_or(Duration::ZERO).as_secs() / 60
}

/// `(average age, oldest age)` in minutes. Both are 0 for no timestamps.
pub fn age_stats(now: SystemTime, timestamps: &[SystemTime]) -> (u64, u64) {
    let ages: Vec<u64> = timestamps.iter().map(|&t| age_minutes(now, t)).collect();
    let total: u64 = ages.iter().sum();
    let average = total / (ages.len() as u64).max(1);
    let oldest = ages.iter().copied().max().unwrap_or(0);
    (average, oldest)
}

/// Per connection class totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassCounts {
    /// Distinct uids with at least one connection of this class.
    pub unique_subscribers: usize,
    /// Sum of open connections of this class.
    pub connections: u64,
}

/// Counts derived from one session snapshot and one connection snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetrics {
    pub sessions: usize,
    pub participants: u64,
    pub observers: u64,
    pub subscribed_sessions: usize,
    pub by_class: Vec<(ConnectionClass, ClassCounts)>,
}

impl SessionMetrics {
    pub fn collect(sessions: &[Session], connections: &ConnectionSnapshot) -> Self {
        let by_class = ConnectionClass::ALL
            .iter()
            .map(|&class| {
                let entries = connections.get(&class).map(Vec::as_slice).unwrap_or(&[]);
                let uids: AHashSet<&str> = entries.iter().map(|(uid, _)| uid.as_str()).collect();
                let counts = ClassCounts {
                    unique_subscribers: uids.len(),
                    connections: entries.iter().map(|(_, n)| *n as u64).sum(),
                };
                (class, counts)
            })
            .collect();

        Self {
            sessions: sessions.len(),
            participants: sessions.iter().map(|s| s.participants as u64).sum(),
            observers: sessions.iter().map(|s| s.observers as u64).sum(),
            subscribed_sessions: sessions.iter().filter(|s| s.subscribed_for_updates).count(),
            by_class,
        }
    }
}

impl fmt::Display for SessionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sessions: {} - Participants: {} - Observers: {} - Subscribed: {}",
            self.sessions, self.participants, self.observers, self.subscribed_sessions
        )?;
        for (class, counts) in &self.by_class {
            write!(f, " - {class}: {} users / {} connections", counts.unique_subscribers, counts.connections)?;
        }
        Ok(())
    }
}

/// Age detail for sessions with an update subscription.
pub fn subscriber_detail(now: SystemTime, sessions: &[Session]) -> String {
    let started: Vec<SystemTime> =
        sessions.iter().filter(|s| s.subscribed_for_updates).map(|s| s.started).collect();
    let (average, oldest) = age_stats(now, &started);
    format!(
        "Subscribed sessions: {} - Average age: {average}min - Oldest: {oldest}min",
        started.len()
    )
}
