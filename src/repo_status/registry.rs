//! Per-application registry of window coordinators.
//!
//! The host application owns one `StatusRegistry`. It holds the resolver
//! that every window shares (repositories are an application-wide concern)
//! and the coordinator of each open window.

use crate::config::StatusConfig;
use crate::repo_status::coordinator::{MarkupSink, StatusCoordinator};
use crate::repo_status::error::StatusError;
use crate::repo_status::resolver::{RepositoryResolver, SharedResolver};
use crate::repo_status::vcs::VcsBackend;
use crate::repo_status::watcher::DirectoryWatcher;
use std::collections::HashMap;

/// Host-side identifier of a top-level window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// Owns the shared resolver and one coordinator per window.
pub struct StatusRegistry {
    config: StatusConfig,
    resolver: SharedResolver,
    windows: HashMap<WindowId, StatusCoordinator>,
}

impl StatusRegistry {
    /// Create a registry whose resolver discovers through `backend`.
    pub fn new(backend: Box<dyn VcsBackend>, config: StatusConfig) -> Self {
        let resolver = RepositoryResolver::new(backend, config.resolver_capacity).shared();
        Self {
            config,
            resolver,
            windows: HashMap::new(),
        }
    }

    /// The resolver shared by every window.
    pub fn resolver(&self) -> &SharedResolver {
        &self.resolver
    }

    /// Create and activate the coordinator for a new window.
    ///
    /// Opening a window id that is already open tears the old one down
    /// first.
    pub fn open_window(
        &mut self,
        id: WindowId,
        watcher: Box<dyn DirectoryWatcher>,
        sink: Box<dyn MarkupSink>,
    ) -> Result<&mut StatusCoordinator, StatusError> {
        self.close_window(id);

        let mut coordinator =
            StatusCoordinator::new(self.resolver.clone(), watcher, sink, self.config.clone());
        coordinator.activate()?;
        tracing::debug!("Opened status window {:?}", id);

        Ok(self.windows.entry(id).or_insert(coordinator))
    }

    /// Get the coordinator of an open window.
    pub fn window(&self, id: WindowId) -> Option<&StatusCoordinator> {
        self.windows.get(&id)
    }

    /// Get the coordinator of an open window, mutably.
    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut StatusCoordinator> {
        self.windows.get_mut(&id)
    }

    /// Number of open windows.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Tear down and forget a window. Returns whether it was open.
    pub fn close_window(&mut self, id: WindowId) -> bool {
        match self.windows.remove(&id) {
            Some(mut coordinator) => {
                coordinator.teardown();
                true
            }
            None => false,
        }
    }

    /// Pump every window. Returns the number of markup updates published.
    pub fn pump_all(&mut self) -> usize {
        self.windows.values_mut().map(StatusCoordinator::pump).sum()
    }

    /// Tear down every window and drop all cached repositories.
    pub fn shutdown(&mut self) {
        for (_, mut coordinator) in self.windows.drain() {
            coordinator.teardown();
        }
        self.resolver.borrow_mut().clear();
    }
}

impl Drop for StatusRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
