//! The selection registry.
//!
//! Entries are keyed by identities captured at insertion, so ordering and
//! uniqueness never depend on whether a weak reference still resolves.
//! Membership changes are decided under the lock; the change notification is
//! sent after the guard is released.

use crate::config::SelectionConfig;
use crate::error::Result;
use crate::notify::{ChangeNotifier, ChangeSubscription, SubscriberId};
use crate::types::{Controllable, ObjectKey, SelectedStripable, Stripable};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Controllable part of an entry.
///
/// `None` means the whole stripable is selected. `Some` holds a control whose
/// target may since have been destroyed; that is never read as `None`.
enum ControllableSlot {
    None,
    Some(Weak<dyn Controllable>),
}

/// Resolution of a [`ControllableSlot`].
enum SlotState {
    Whole,
    Live(Arc<dyn Controllable>),
    Expired,
}

impl ControllableSlot {
    fn new(controllable: Option<&Arc<dyn Controllable>>) -> Self {
        match controllable {
            Some(c) => ControllableSlot::Some(Arc::downgrade(c)),
            None => ControllableSlot::None,
        }
    }

    fn resolve(&self) -> SlotState {
        match self {
            ControllableSlot::None => SlotState::Whole,
            ControllableSlot::Some(weak) => match weak.upgrade() {
                Some(c) => SlotState::Live(c),
                None => SlotState::Expired,
            },
        }
    }

    /// True if a control was selected and has since been destroyed.
    fn is_expired(&self) -> bool {
        match self {
            ControllableSlot::None => false,
            ControllableSlot::Some(weak) => weak.strong_count() == 0,
        }
    }

    /// True if the slot targets `key` and the target is still alive.
    /// Does not create a strong reference.
    fn holds_live(&self, key: ObjectKey) -> bool {
        match self {
            ControllableSlot::None => false,
            ControllableSlot::Some(weak) => {
                ObjectKey::of_weak(weak) == key && weak.strong_count() > 0
            }
        }
    }
}

/// Controllable half of an entry key. `Whole` sorts before any control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SlotKey {
    Whole,
    Control(ObjectKey),
}

/// Uniqueness key of an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct EntryKey {
    stripable: ObjectKey,
    slot: SlotKey,
}

impl EntryKey {
    fn new(stripable: &Arc<dyn Stripable>, controllable: Option<&Arc<dyn Controllable>>) -> Self {
        Self {
            stripable: ObjectKey::of(stripable),
            slot: match controllable {
                Some(c) => SlotKey::Control(ObjectKey::of(c)),
                None => SlotKey::Whole,
            },
        }
    }
}

/// One selected unit. Immutable once inserted.
struct Entry {
    stripable: Weak<dyn Stripable>,
    controllable: ControllableSlot,
    /// Insertion sequence, for `first_selected_stripable`.
    order: u64,
}

impl Entry {
    /// False once the stripable, or the selected controllable, is gone.
    /// Does not create a strong reference.
    fn is_live(&self) -> bool {
        self.stripable.strong_count() > 0 && !self.controllable.is_expired()
    }
}

/// Everything guarded by the registry lock.
#[derive(Default)]
struct SelectionState {
    entries: BTreeMap<EntryKey, Entry>,
    next_order: u64,
}

impl SelectionState {
    /// Insert an entry if no equivalent one exists. Returns true if inserted.
    fn insert(
        &mut self,
        key: EntryKey,
        stripable: &Arc<dyn Stripable>,
        controllable: Option<&Arc<dyn Controllable>>,
    ) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }

        let order = self.next_order;
        self.next_order += 1;

        self.entries.insert(
            key,
            Entry {
                stripable: Arc::downgrade(stripable),
                controllable: ControllableSlot::new(controllable),
                order,
            },
        );
        true
    }

    /// Remove the given entries if they are still dead. A key may have been
    /// removed and reinserted for a new object since it was found expired.
    fn prune(&mut self, keys: &[EntryKey]) -> usize {
        let mut pruned = 0;
        for key in keys {
            if self.entries.get(key).map_or(false, |entry| !entry.is_live()) {
                self.entries.remove(key);
                pruned += 1;
            }
        }
        pruned
    }
}

/// Thread-safe registry of selected stripables and controllables.
///
/// Holds only weak references. `add`, `remove`, `set` and `clear` return
/// whether membership changed, and fire one change notification exactly when
/// it did.
pub struct CoreSelection {
    /// Entry set and insertion counter.
    state: RwLock<SelectionState>,
    /// Subscribers of the "selection changed" notification.
    notifier: ChangeNotifier,
}

impl CoreSelection {
    /// Create an empty selection with default configuration.
    pub fn new() -> Self {
        Self::with_config(SelectionConfig::default())
    }

    /// Create an empty selection.
    pub fn with_config(config: SelectionConfig) -> Self {
        Self {
            state: RwLock::new(SelectionState::default()),
            notifier: ChangeNotifier::with_buffer_size(config.subscriber_buffer_size),
        }
    }

    // --- Mutation ---

    /// Select a stripable, or one of its controllables.
    ///
    /// No-op if the pair is already selected.
    pub fn add(
        &self,
        stripable: &Arc<dyn Stripable>,
        controllable: Option<&Arc<dyn Controllable>>,
    ) -> bool {
        let key = EntryKey::new(stripable, controllable);
        let added = self.state.write().insert(key, stripable, controllable);

        if added {
            debug!(
                stripable = stripable.name(),
                controllable = ?controllable.map(|c| c.name()),
                "Selection added"
            );
            self.notifier.notify();
        } else {
            trace!(stripable = stripable.name(), "Already selected");
        }
        added
    }

    /// Deselect a pair. No-op if it is not selected.
    pub fn remove(
        &self,
        stripable: &Arc<dyn Stripable>,
        controllable: Option<&Arc<dyn Controllable>>,
    ) -> bool {
        let key = EntryKey::new(stripable, controllable);
        let removed = self.state.write().entries.remove(&key).is_some();

        if removed {
            debug!(
                stripable = stripable.name(),
                controllable = ?controllable.map(|c| c.name()),
                "Selection removed"
            );
            self.notifier.notify();
        }
        removed
    }

    /// Replace the whole selection with exactly this pair.
    ///
    /// If the selection already is exactly this pair nothing happens and no
    /// notification is sent.
    pub fn set(
        &self,
        stripable: &Arc<dyn Stripable>,
        controllable: Option<&Arc<dyn Controllable>>,
    ) -> bool {
        let key = EntryKey::new(stripable, controllable);

        let replaced = {
            let mut state = self.state.write();
            if state.entries.len() == 1 && state.entries.contains_key(&key) {
                false
            } else {
                state.entries.clear();
                state.insert(key, stripable, controllable)
            }
        };

        if replaced {
            debug!(
                stripable = stripable.name(),
                controllable = ?controllable.map(|c| c.name()),
                "Selection set"
            );
            self.notifier.notify();
        } else {
            trace!(stripable = stripable.name(), "Selection already set");
        }
        replaced
    }

    /// Select the pair if it is not selected, deselect it otherwise.
    ///
    /// Always changes membership. Returns whether the pair is now selected.
    pub fn toggle(
        &self,
        stripable: &Arc<dyn Stripable>,
        controllable: Option<&Arc<dyn Controllable>>,
    ) -> bool {
        let key = EntryKey::new(stripable, controllable);

        let now_selected = {
            let mut state = self.state.write();
            if state.entries.remove(&key).is_some() {
                false
            } else {
                state.insert(key, stripable, controllable)
            }
        };

        debug!(
            stripable = stripable.name(),
            controllable = ?controllable.map(|c| c.name()),
            selected = now_selected,
            "Selection toggled"
        );
        self.notifier.notify();
        now_selected
    }

    /// Empty the selection. Notifies only if it was non-empty.
    pub fn clear(&self) -> bool {
        let cleared = {
            let mut state = self.state.write();
            let count = state.entries.len();
            state.entries.clear();
            count
        };

        if cleared > 0 {
            debug!(entries = cleared, "Selection cleared");
            self.notifier.notify();
            true
        } else {
            false
        }
    }

    // --- Queries ---

    /// True if the stripable itself is selected.
    ///
    /// An entry selecting one of its controllables does not count.
    pub fn selected_stripable(&self, stripable: &Arc<dyn Stripable>) -> bool {
        let key = EntryKey::new(stripable, None);
        self.state
            .read()
            .entries
            .get(&key)
            .map_or(false, |entry| entry.stripable.strong_count() > 0)
    }

    /// True if some entry selects this controllable.
    pub fn selected_controllable(&self, controllable: &Arc<dyn Controllable>) -> bool {
        let key = ObjectKey::of(controllable);
        self.state
            .read()
            .entries
            .values()
            .any(|entry| entry.controllable.holds_live(key))
    }

    /// Resolve the current selection to strong references.
    ///
    /// Entries whose stripable (or selected controllable) no longer exists
    /// are removed from the registry and left out of the result.
    pub fn enumerate(&self) -> Vec<SelectedStripable> {
        let mut live = Vec::new();
        let mut expired = Vec::new();
        // Strong refs taken while resolving are released after the guard, so
        // a destructor never runs under the lock.
        let mut released: Vec<Arc<dyn Stripable>> = Vec::new();

        {
            let state = self.state.read();
            for (key, entry) in state.entries.iter() {
                let Some(stripable) = entry.stripable.upgrade() else {
                    expired.push(*key);
                    continue;
                };
                match entry.controllable.resolve() {
                    SlotState::Whole => live.push(SelectedStripable {
                        stripable,
                        controllable: None,
                    }),
                    SlotState::Live(c) => live.push(SelectedStripable {
                        stripable,
                        controllable: Some(c),
                    }),
                    SlotState::Expired => {
                        expired.push(*key);
                        released.push(stripable);
                    }
                }
            }
        }

        if !expired.is_empty() {
            let mut state = self.state.write();
            let pruned = state.prune(&expired);
            debug!(
                pruned,
                remaining = state.entries.len(),
                "Pruned expired selection entries"
            );
        }

        drop(released);
        live
    }

    /// The stripable of the earliest-selected entry that is still live.
    ///
    /// Entries whose selected controllable is gone are skipped, as in
    /// `enumerate`.
    pub fn first_selected_stripable(&self) -> Option<Arc<dyn Stripable>> {
        let mut candidates: Vec<(u64, Weak<dyn Stripable>)> = self
            .state
            .read()
            .entries
            .values()
            .filter(|entry| entry.is_live())
            .map(|entry| (entry.order, entry.stripable.clone()))
            .collect();

        candidates.sort_by_key(|(order, _)| *order);
        candidates.iter().find_map(|(_, weak)| weak.upgrade())
    }

    /// Number of entries held, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// True if no entries are held, expired ones included.
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    // --- Notification ---

    /// Register a callback run after every membership change.
    ///
    /// The callback runs on the mutating thread with no registry lock held.
    pub fn subscribe<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifier.subscribe(callback)
    }

    /// Register a channel subscriber.
    pub fn subscribe_channel(&self) -> ChangeSubscription {
        self.notifier.subscribe_channel()
    }

    /// Remove a subscriber.
    pub fn unsubscribe(&self, id: SubscriberId) -> Result<()> {
        self.notifier.unsubscribe(id)
    }

    /// The notifier, for collaborators that forward changes elsewhere.
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

impl Default for CoreSelection {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CoreSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreSelection")
            .field("entries", &self.len())
            .field("subscribers", &self.notifier.subscriber_count())
            .finish()
    }
}
