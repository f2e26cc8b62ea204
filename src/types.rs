//! Core types for the selection registry.

use std::fmt;
use std::sync::{Arc, Weak};

/// A mixer-strip-like object (track, bus) that can be selected as a whole.
///
/// The registry only needs identity; the name is used for logging.
pub trait Stripable: Send + Sync {
    fn name(&self) -> &str;
}

/// An automatable parameter belonging to a [`Stripable`].
pub trait Controllable: Send + Sync {
    fn name(&self) -> &str;
}

/// Stable identity of a shared object, captured when an entry is inserted.
///
/// Derived from the address of the `Arc` allocation. A `Weak` keeps that
/// allocation reserved, so while an entry holds its weak reference no other
/// object can ever produce the same key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey(usize);

impl ObjectKey {
    /// Key of a live object.
    pub fn of<T: ?Sized>(object: &Arc<T>) -> Self {
        ObjectKey(Arc::as_ptr(object) as *const () as usize)
    }

    /// Key of a weakly referenced object, whether or not it still resolves.
    pub fn of_weak<T: ?Sized>(object: &Weak<T>) -> Self {
        ObjectKey(Weak::as_ptr(object) as *const () as usize)
    }
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectKey({:#x})", self.0)
    }
}

/// One selected unit, resolved to strong references.
///
/// `controllable` is `None` when the whole stripable is selected.
#[derive(Clone)]
pub struct SelectedStripable {
    pub stripable: Arc<dyn Stripable>,
    pub controllable: Option<Arc<dyn Controllable>>,
}

impl SelectedStripable {
    /// True if this entry selects the stripable itself rather than one of
    /// its controls.
    pub fn is_whole_stripable(&self) -> bool {
        self.controllable.is_none()
    }
}

impl fmt::Debug for SelectedStripable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedStripable")
            .field("stripable", &self.stripable.name())
            .field("controllable", &self.controllable.as_ref().map(|c| c.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Strip(String);

    impl Stripable for Strip {
        fn name(&self) -> &str {
            &self.0
        }
    }

    #[test]
    fn test_key_matches_between_strong_and_weak() {
        let strip: Arc<dyn Stripable> = Arc::new(Strip("Audio 1".to_string()));
        let weak = Arc::downgrade(&strip);

        assert_eq!(ObjectKey::of(&strip), ObjectKey::of_weak(&weak));
    }

    #[test]
    fn test_key_survives_expiry() {
        let strip: Arc<dyn Stripable> = Arc::new(Strip("Audio 1".to_string()));
        let key = ObjectKey::of(&strip);
        let weak = Arc::downgrade(&strip);
        drop(strip);

        assert!(weak.upgrade().is_none());
        assert_eq!(ObjectKey::of_weak(&weak), key);
    }

    #[test]
    fn test_distinct_objects_have_distinct_keys() {
        let a: Arc<dyn Stripable> = Arc::new(Strip("a".to_string()));
        let b: Arc<dyn Stripable> = Arc::new(Strip("a".to_string()));

        assert_ne!(ObjectKey::of(&a), ObjectKey::of(&b));
        assert_eq!(ObjectKey::of(&a), ObjectKey::of(&a.clone()));
    }
}
