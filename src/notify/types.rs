//! Notification types for selection changes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Events delivered to channel subscribers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectionEvent {
    /// Selection membership changed; re-query the registry.
    Changed,

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a channel subscriber was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Receiver was dropped.
    Disconnected,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscriber. Ids increase with subscription order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for a channel subscription.
pub struct ChangeSubscription {
    pub id: SubscriberId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<SelectionEvent>,
}

impl ChangeSubscription {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<SelectionEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<SelectionEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<SelectionEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain all pending events, returning how many `Changed` events were queued.
    pub fn drain_changes(&self) -> usize {
        self.receiver
            .try_iter()
            .filter(|event| *event == SelectionEvent::Changed)
            .count()
    }
}
