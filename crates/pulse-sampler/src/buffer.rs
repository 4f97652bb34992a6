//! Outbound buffer adapters over tokio channels.
//!
//! Reading `len`/`capacity` of a tokio channel takes no lock that the
//! senders contend on for long, so these are safe to poll from the sampler.

use pulse_core::source::{BufferState, OutboundBuffer};
use tokio::sync::{broadcast, mpsc};

/// Backlog of a bounded `mpsc` channel, seen from a sender clone.
pub struct MpscBacklog<T> {
    tx: mpsc::Sender<T>,
}

impl<T> MpscBacklog<T> {
    pub fn new(tx: mpsc::Sender<T>) -> Self {
        Self { tx }
    }
}

impl<T: Send> OutboundBuffer for MpscBacklog<T> {
    fn state(&self) -> BufferState {
        let capacity = self.tx.max_capacity();
        BufferState { queued: capacity.saturating_sub(self.tx.capacity()), capacity }
    }
}

/// Backlog of a `broadcast` channel: values not yet seen by the slowest
/// receiver.
///
/// tokio does not expose a broadcast channel's capacity, so it is passed in
/// alongside the sender. tokio rounds the requested capacity up to a power of
/// two, and so does this view.
pub struct BroadcastBacklog<T> {
    tx: broadcast::Sender<T>,
    capacity: usize,
}

impl<T> BroadcastBacklog<T> {
    /// `capacity` is the value the channel was created with.
    pub fn new(tx: broadcast::Sender<T>, capacity: usize) -> Self {
        Self { tx, capacity: capacity.next_power_of_two() }
    }

    /// Create a broadcast channel and its backlog view together.
    pub fn channel(capacity: usize) -> (Self, broadcast::Receiver<T>)
    where
        T: Clone,
    {
        let (tx, rx) = broadcast::channel(capacity);
        (Self::new(tx, capacity), rx)
    }

    pub fn sender(&self) -> &broadcast::Sender<T> {
        &self.tx
    }
}

impl<T: Send> OutboundBuffer for BroadcastBacklog<T> {
    fn state(&self) -> BufferState {
        BufferState { queued: self.tx.len(), capacity: self.capacity }
    }
}
