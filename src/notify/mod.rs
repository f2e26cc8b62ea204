//! Change notification for the selection registry.
//!
//! A mutation that changes membership fires one zero-argument "selection
//! changed" notification. Subscribers come in two forms:
//! - Callbacks, invoked synchronously on the mutating thread
//! - Bounded channels, for consumers on other threads
//!
//! Delivery always happens with no registry lock held, so a callback may
//! query or mutate the selection it is observing.
//!
//! # Example
//!
//! ```ignore
//! let selection = CoreSelection::new();
//!
//! let id = selection.subscribe(|| println!("selection changed"));
//! let handle = selection.subscribe_channel();
//!
//! selection.add(&track, None);
//! assert_eq!(handle.try_recv(), Ok(SelectionEvent::Changed));
//!
//! selection.unsubscribe(id)?;
//! ```

mod manager;
mod types;

pub use manager::ChangeNotifier;
pub use types::{ChangeSubscription, DropReason, SelectionEvent, SubscriberId};
