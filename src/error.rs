//! Error types for the selection registry.

use crate::notify::SubscriberId;
use thiserror::Error;

/// Errors raised by the notification surface.
///
/// Selection operations themselves never fail: an expired weak reference or a
/// redundant add/remove is a normal outcome, not an error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Subscriber not found: {0}")]
    UnknownSubscriber(SubscriberId),
}

/// Result type for selection operations.
pub type Result<T> = std::result::Result<T, SelectionError>;
