//! Registry configuration.

/// Default number of buffered change events per channel subscriber.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

/// Configuration for a [`CoreSelection`](crate::CoreSelection).
#[derive(Clone, Debug)]
pub struct SelectionConfig {
    /// Max buffered change events before a channel subscriber is dropped.
    /// Default: 64
    pub subscriber_buffer_size: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer_size: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}
