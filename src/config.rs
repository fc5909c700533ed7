//! Tunables for the status subsystem.

use std::time::Duration;

/// Configuration shared by the registry and its coordinators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusConfig {
    /// Maximum directories kept in the resolver cache before LRU eviction.
    pub resolver_capacity: usize,
    /// Minimum time between batches of directory change events.
    pub watcher_debounce: Duration,
    /// Size of the presentation broadcast channel buffer.
    pub channel_capacity: usize,
    /// Name given to each coordinator's worker thread.
    pub worker_thread_name: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            resolver_capacity: 4096,                     // Default: 4k directories
            watcher_debounce: Duration::from_millis(200), // Default: 200ms
            channel_capacity: 256,                       // Default: 256 pending updates
            worker_thread_name: "git-status-worker".to_string(),
        }
    }
}

impl StatusConfig {
    /// Set the maximum number of cached directories.
    pub fn resolver_capacity(mut self, capacity: usize) -> Self {
        self.resolver_capacity = capacity;
        self
    }

    /// Set the watcher debounce window.
    pub fn watcher_debounce(mut self, debounce: Duration) -> Self {
        self.watcher_debounce = debounce;
        self
    }

    /// Set the browser event channel capacity.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the worker thread name.
    pub fn worker_thread_name(mut self, name: impl Into<String>) -> Self {
        self.worker_thread_name = name.into();
        self
    }
}
