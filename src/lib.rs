//! Git Status Cache
//!
//! This crate tracks the version-control status of the files a text
//! editor's file browser is showing, without ever blocking the UI thread.
//!
//! ## What It Does
//!
//! - Resolves which repository encloses a location, caching the answer for
//!   every directory on the way so siblings never trigger another discovery
//! - Runs blocking status queries on one background worker per window
//! - Watches the browser's directories and refreshes files whose content
//!   changed
//! - Publishes each file's status as markup (bold for new or modified,
//!   struck through for deleted)
//!
//! ## Flow
//!
//! ```text
//! host event (root changed, file shown, focus, directory change)
//!        ↓
//! StatusCoordinator [UI CONTEXT]
//!        ↓ resolve via RepositoryResolver (LRU cache)
//! StatusWorker.push(handle, path)
//!        ↓
//! Repository::status() [WORKER THREAD]
//!        ↓ mpsc
//! StatusCoordinator.pump() re-validates [UI CONTEXT]
//!        ↓
//! MarkupSink.set_markup(id, markup)
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use git_status_cache::prelude::*;
//! use std::path::PathBuf;
//! use std::time::Duration;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = StatusConfig::default();
//!     let mut registry = StatusRegistry::new(Box::new(GitBackend::new()), config);
//!
//!     let watcher = NotifyDirectoryWatcher::new(Duration::from_millis(200))?;
//!     let (sink, _events) = BroadcastMarkupSink::new(256);
//!
//!     let window = registry.open_window(WindowId(1), Box::new(watcher), Box::new(sink))?;
//!     window.on_root_changed(Location::from(PathBuf::from("/path/to/repo")));
//!     window.on_file_tracked(
//!         Location::from(PathBuf::from("/path/to/repo/README.md")),
//!         DisplayId(1),
//!         "README.md",
//!         false,
//!     );
//!
//!     // From the UI loop
//!     registry.pump_all();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`repo_status`]: Resolution, background status, watching, coordination
//!   - [`repo_status::resolver`]: Repository resolver and its cache
//!   - [`repo_status::worker`]: Background status worker
//!   - [`repo_status::watcher`]: Directory watchers
//!   - [`repo_status::coordinator`]: Per-window coordinator
//!   - [`repo_status::registry`]: Application-wide window registry
//! - [`ui`]: File browser presentation
//! - [`config`]: Tunables

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod repo_status;
pub mod ui;

/// Re-exports for convenience.
pub mod prelude {
    pub use crate::config::StatusConfig;
    pub use crate::repo_status::{
        ChangeKind, CoordinatorState, DirectoryWatcher, DisplayId, GitBackend, Location,
        MarkupSink, NotifyDirectoryWatcher, RepositoryHandle, RepositoryResolver,
        StatusCoordinator, StatusError, StatusFlags, StatusRegistry, StatusWorker, VcsBackend,
        WatcherError, WindowId,
    };
    pub use crate::ui::{
        BroadcastMarkupSink, BrowserEvent, FileBrowserHandle, FileBrowserPane,
        FileBrowserPaneBuilder,
    };
}

/// Pump every window of `registry` until `shutdown` fires.
///
/// The registry lives on the UI-bound context, so this runs on the task
/// that owns it rather than being spawned.
///
/// # Arguments
/// * `registry` - The registry to pump
/// * `poll_interval_ms` - How often to pump (default: 50ms)
/// * `shutdown` - Stops the loop when a value arrives or the sender drops
pub async fn run_pump_loop(
    registry: &mut repo_status::StatusRegistry,
    poll_interval_ms: u64,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    let poll_interval = std::time::Duration::from_millis(poll_interval_ms);

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = tokio::time::sleep(poll_interval) => {
                registry.pump_all();
            }
        }
    }
}
