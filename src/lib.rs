//! # Core Selection
//!
//! A thread-safe registry of which stripables (tracks, busses) and which of
//! their individual controllables are currently selected.
//!
//! ## Core Concepts
//!
//! - **Entries**: `(stripable, optional controllable)` pairs held by weak reference
//! - **Lazy cleanup**: entries for destroyed objects are pruned by `enumerate`
//! - **Notification**: one zero-argument change signal per membership change,
//!   always delivered after the registry lock is released
//!
//! ## Example
//!
//! ```ignore
//! use core_selection::{CoreSelection, Stripable};
//!
//! let selection = CoreSelection::new();
//! selection.subscribe(|| println!("selection changed"));
//!
//! // Select a whole track, then only its gain control
//! selection.add(&track, None);
//! selection.set(&track, Some(&gain));
//!
//! assert!(!selection.selected_stripable(&track));
//! assert!(selection.selected_controllable(&gain));
//! ```

pub mod config;
pub mod error;
pub mod notify;
pub mod selection;
pub mod types;

// Re-exports
pub use config::SelectionConfig;
pub use error::{Result, SelectionError};
pub use notify::{ChangeNotifier, ChangeSubscription, DropReason, SelectionEvent, SubscriberId};
pub use selection::CoreSelection;
pub use types::{Controllable, ObjectKey, SelectedStripable, Stripable};
