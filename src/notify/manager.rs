//! Subscriber list for broadcasting selection changes.

use crate::config::DEFAULT_SUBSCRIBER_BUFFER;
use crate::error::{Result, SelectionError};
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

use super::types::{ChangeSubscription, DropReason, SelectionEvent, SubscriberId};

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Internal subscriber state.
#[derive(Clone)]
enum Subscriber {
    Callback(Callback),
    Channel(Sender<SelectionEvent>),
}

impl Subscriber {
    /// Deliver one change. Returns the drop reason if the subscriber must go.
    fn deliver(&self) -> Option<DropReason> {
        match self {
            Subscriber::Callback(callback) => {
                callback();
                None
            }
            Subscriber::Channel(sender) => match sender.try_send(SelectionEvent::Changed) {
                Ok(()) => None,
                Err(TrySendError::Full(_)) => Some(DropReason::BufferOverflow),
                Err(TrySendError::Disconnected(_)) => Some(DropReason::Disconnected),
            },
        }
    }
}

/// Owns the subscribers of the "selection changed" notification.
///
/// Subscribers are kept in subscription order and notified in that order.
pub struct ChangeNotifier {
    /// Active subscribers by ID. Ids are monotonic, so map order is subscription order.
    subscribers: RwLock<BTreeMap<SubscriberId, Subscriber>>,
    /// Counter for generating subscriber IDs.
    next_id: AtomicU64,
    /// Channel capacity for channel subscribers.
    buffer_size: usize,
}

impl ChangeNotifier {
    /// Create a notifier with the default channel buffer size.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_SUBSCRIBER_BUFFER)
    }

    /// Create a notifier with a custom channel buffer size.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            subscribers: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            buffer_size,
        }
    }

    fn allocate_id(&self) -> SubscriberId {
        SubscriberId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Register a callback invoked after every membership change.
    pub fn subscribe<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.allocate_id();
        self.subscribers
            .write()
            .insert(id, Subscriber::Callback(Arc::new(callback)));
        id
    }

    /// Register a bounded channel receiving [`SelectionEvent::Changed`].
    ///
    /// A subscriber that lets its buffer fill up is dropped.
    pub fn subscribe_channel(&self) -> ChangeSubscription {
        let id = self.allocate_id();
        let (sender, receiver) = bounded(self.buffer_size);

        self.subscribers
            .write()
            .insert(id, Subscriber::Channel(sender));

        ChangeSubscription { id, receiver }
    }

    /// Unsubscribe and clean up.
    ///
    /// A delivery already past its registration check on another thread may
    /// still run the callback once after this returns.
    pub fn unsubscribe(&self, id: SubscriberId) -> Result<()> {
        let removed = self.subscribers.write().remove(&id);
        match removed {
            Some(Subscriber::Channel(sender)) => {
                // Best effort, the receiver may already be gone
                let _ = sender.try_send(SelectionEvent::Dropped {
                    reason: DropReason::Unsubscribed,
                });
                Ok(())
            }
            Some(Subscriber::Callback(_)) => Ok(()),
            None => Err(SelectionError::UnknownSubscriber(id)),
        }
    }

    /// Get subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Notify every subscriber, in subscription order.
    ///
    /// The subscriber list is copied out first; no lock is held while
    /// callbacks run. Each subscriber is re-checked just before delivery, so
    /// one removed by an earlier callback is skipped.
    pub fn notify(&self) {
        let snapshot: Vec<(SubscriberId, Subscriber)> = self
            .subscribers
            .read()
            .iter()
            .map(|(id, sub)| (*id, sub.clone()))
            .collect();

        trace!(subscribers = snapshot.len(), "Delivering selection change");

        let mut to_remove = Vec::new();
        for (id, sub) in &snapshot {
            if !self.subscribers.read().contains_key(id) {
                trace!(subscriber = %id, "Skipping removed subscriber");
                continue;
            }
            if let Some(reason) = sub.deliver() {
                to_remove.push((*id, reason));
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscribers.write();
            for (id, reason) in to_remove {
                if let Some(Subscriber::Channel(sender)) = subs.remove(&id) {
                    warn!(subscriber = %id, ?reason, "Dropping selection subscriber");
                    let _ = sender.try_send(SelectionEvent::Dropped { reason });
                }
            }
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
