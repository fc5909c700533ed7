//! Repository status tracking.
//!
//! This module provides:
//! - `resolver`: directory-to-repository lookup with a bounded LRU cache
//! - `worker`: the background thread running status queries
//! - `watcher`: debounced directory watching
//! - `coordinator`: per-window orchestration and markup publishing
//! - `registry`: the application-owned set of window coordinators
//! - `git`: the `git2` backend

pub mod coordinator;
pub mod error;
pub mod git;
pub mod location;
pub mod registry;
pub mod resolver;
pub mod status;
pub mod vcs;
pub mod watcher;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{CoordinatorState, DisplayId, MarkupSink, StatusCoordinator, TrackedFile};
pub use error::StatusError;
pub use git::{GitBackend, GitRepository};
pub use location::Location;
pub use registry::{StatusRegistry, WindowId};
pub use resolver::{RepositoryResolver, ResolverStats, SharedResolver};
pub use status::{escape_markup, render_markup, MarkupStyle, StatusFlags, StatusResult};
pub use vcs::{Repository, RepositoryHandle, VcsBackend};
pub use watcher::{
    ChangeKind, DirectoryChangeEvent, DirectoryWatcher, NotifyDirectoryWatcher, WatchHandle,
    WatcherError,
};
pub use worker::{ResultCallback, StatusWorker, WorkQueueEntry};
