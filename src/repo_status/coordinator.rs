//! Per-window status coordination.
//!
//! The `StatusCoordinator` maps host events (root changes, files appearing
//! in the browser, focus, directory changes, open documents) onto resolver
//! lookups and worker requests, and turns delivered results into markup for
//! the file browser.
//!
//! All of it runs on the UI-bound context. The only thing that crosses to
//! the worker thread is an immutable `(handle, path)` pair, and results come
//! back through a channel drained by [`StatusCoordinator::pump`]. Because the
//! queue and the host keep moving while a query runs, every delivered result
//! is re-validated before it is published.

use crate::config::StatusConfig;
use crate::repo_status::error::StatusError;
use crate::repo_status::location::Location;
use crate::repo_status::resolver::SharedResolver;
use crate::repo_status::status::{render_markup, StatusFlags, StatusResult};
use crate::repo_status::vcs::RepositoryHandle;
use crate::repo_status::watcher::{ChangeKind, DirectoryWatcher, WatchHandle};
use crate::repo_status::worker::StatusWorker;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

/// Host-side identifier of a file browser entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayId(pub u64);

/// The presentation collaborator.
pub trait MarkupSink {
    /// Replace the markup shown for entry `id`.
    fn set_markup(&mut self, id: DisplayId, markup: &str);

    /// Ask the host to re-announce its entries. Carries no markup.
    fn request_refresh(&mut self) {}
}

/// A file currently visible in the file browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    /// Where the file lives; also its key.
    pub location: Location,
    /// The browser entry to mark up.
    pub display_id: DisplayId,
    /// Name shown in the browser, before escaping.
    pub display_name: String,
    /// Latest request submitted for this file; older results are stale.
    latest_request: Option<u64>,
}

impl TrackedFile {
    fn new(location: Location, display_id: DisplayId, display_name: String) -> Self {
        Self {
            location,
            display_id,
            display_name,
            latest_request: None,
        }
    }
}

/// Lifecycle state of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Not activated, or torn down.
    Inactive,
    /// Active, but the browser root is not inside a repository.
    NoRepository,
    /// Active with a repository for the browser root.
    RepositoryBound,
}

/// Orchestrates resolver, worker and watcher for one window.
pub struct StatusCoordinator {
    state: CoordinatorState,
    config: StatusConfig,
    resolver: SharedResolver,
    watcher: Box<dyn DirectoryWatcher>,
    sink: Box<dyn MarkupSink>,
    worker: Option<StatusWorker>,
    results: Option<Receiver<StatusResult>>,
    root: Option<Location>,
    repository: Option<RepositoryHandle>,
    files: HashMap<Location, TrackedFile>,
    /// Status reported by open editors, which know about unsaved changes.
    documents: HashMap<Location, StatusFlags>,
    monitors: HashMap<PathBuf, WatchHandle>,
}

impl StatusCoordinator {
    /// Create an inactive coordinator.
    pub fn new(
        resolver: SharedResolver,
        watcher: Box<dyn DirectoryWatcher>,
        sink: Box<dyn MarkupSink>,
        config: StatusConfig,
    ) -> Self {
        Self {
            state: CoordinatorState::Inactive,
            config,
            resolver,
            watcher,
            sink,
            worker: None,
            results: None,
            root: None,
            repository: None,
            files: HashMap::new(),
            documents: HashMap::new(),
            monitors: HashMap::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Whether the coordinator has been activated and not torn down.
    pub fn is_active(&self) -> bool {
        self.state != CoordinatorState::Inactive
    }

    /// Repository governing the current browser root.
    pub fn repository(&self) -> Option<&RepositoryHandle> {
        self.repository.as_ref()
    }

    /// Current browser root, if one was announced.
    pub fn root(&self) -> Option<&Location> {
        self.root.as_ref()
    }

    /// Look up a tracked file by location.
    pub fn tracked_file(&self, location: &Location) -> Option<&TrackedFile> {
        self.files.get(location)
    }

    /// Number of tracked files.
    pub fn tracked_count(&self) -> usize {
        self.files.len()
    }

    /// Directories currently being watched.
    pub fn monitored_directories(&self) -> impl Iterator<Item = &Path> {
        self.monitors.keys().map(PathBuf::as_path)
    }

    /// Status requests not yet answered by the worker.
    pub fn pending_requests(&self) -> usize {
        self.worker.as_ref().map_or(0, StatusWorker::pending)
    }

    /// Start the worker and ask the host to re-announce its files.
    pub fn activate(&mut self) -> Result<(), StatusError> {
        if self.is_active() {
            return Ok(());
        }

        let (worker, results) = StatusWorker::with_channel(&self.config.worker_thread_name)?;
        self.worker = Some(worker);
        self.results = Some(results);
        self.state = CoordinatorState::NoRepository;
        tracing::info!("Status coordinator activated");

        self.sink.request_refresh();
        Ok(())
    }

    /// The file browser moved to a new root directory.
    ///
    /// Everything learned about the previous root is dropped: watches,
    /// queued requests, tracked files and the shared resolver cache.
    pub fn on_root_changed(&mut self, location: Location) {
        if !self.is_active() {
            tracing::warn!("Root change to {} while inactive, ignoring", location);
            return;
        }

        self.clear_monitors();
        if let Some(worker) = &self.worker {
            worker.clear();
        }
        self.files.clear();
        self.resolver.borrow_mut().clear();

        let repository = self.resolver.borrow_mut().resolve(&location, true);
        match (repository, location.as_path().map(Path::to_path_buf)) {
            (Some(repository), Some(dir)) => {
                tracing::debug!(
                    "Root {} is in repository {}",
                    location,
                    repository.git_dir().display()
                );
                self.repository = Some(repository);
                self.state = CoordinatorState::RepositoryBound;
                self.monitor_directory(&dir);
            }
            _ => {
                tracing::debug!("Root {} is not in a repository", location);
                self.repository = None;
                self.state = CoordinatorState::NoRepository;
            }
        }
        self.root = Some(location);
    }

    /// The file browser is showing a new entry.
    pub fn on_file_tracked(
        &mut self,
        location: Location,
        display_id: DisplayId,
        display_name: impl Into<String>,
        is_dir: bool,
    ) {
        if !self.is_active() {
            return;
        }

        self.files.insert(
            location.clone(),
            TrackedFile::new(location.clone(), display_id, display_name.into()),
        );
        self.request_status(&location);

        if is_dir {
            if let Some(dir) = location.as_path().map(Path::to_path_buf) {
                self.monitor_directory(&dir);
            }
        }
    }

    /// The file browser removed an entry.
    ///
    /// Some hosts never send this, in which case tracked files accumulate
    /// until the next root change or teardown.
    pub fn on_file_untracked(&mut self, location: &Location) {
        self.files.remove(location);

        if let Some(dir) = location.as_path() {
            if let Some(handle) = self.monitors.remove(dir) {
                self.watcher.cancel(handle);
            }
        }
    }

    /// The window regained focus; anything may have changed meanwhile.
    pub fn on_focus_gained(&mut self) {
        let locations: Vec<Location> = self.files.keys().cloned().collect();
        for location in locations {
            self.request_status(&location);
        }
    }

    /// A watched directory reported a change.
    ///
    /// Creations and deletions are the file browser's business; only
    /// content changes to tracked files trigger a refresh.
    pub fn on_directory_change_event(&mut self, path: &Path, kind: ChangeKind) {
        if kind != ChangeKind::Changed {
            return;
        }

        let location = Location::from(path);
        if self.files.contains_key(&location) {
            self.request_status(&location);
        }
    }

    /// An open editor reported its own status for `location`.
    ///
    /// `None` means the editor has no opinion (e.g. it is unmodified and
    /// has not been compared yet).
    pub fn on_document_status(&mut self, location: Location, flags: Option<StatusFlags>) {
        if !self.is_active() {
            return;
        }

        match flags {
            Some(flags) => {
                self.documents.insert(location.clone(), flags);
            }
            None => {
                self.documents.remove(&location);
            }
        }
        self.request_status(&location);
    }

    /// An editor tab for `location` was closed.
    ///
    /// The document status must go, otherwise the file would keep showing
    /// the editor's view instead of what is on disk.
    pub fn on_document_closed(&mut self, location: &Location) {
        if self.documents.remove(location).is_some() {
            self.request_status(location);
        }
    }

    /// Drain watcher events and worker results. Call from the UI loop.
    ///
    /// Returns the number of markup updates published.
    pub fn pump(&mut self) -> usize {
        if !self.is_active() {
            return 0;
        }

        for event in self.watcher.poll_events() {
            self.on_directory_change_event(&event.path, event.kind);
        }
        self.process_results()
    }

    /// Publish every result delivered so far that is still current.
    pub fn process_results(&mut self) -> usize {
        let Some(results) = self.results.as_ref() else {
            return 0;
        };
        let delivered: Vec<StatusResult> = results.try_iter().collect();

        delivered
            .into_iter()
            .filter(|result| self.apply_result(result))
            .count()
    }

    /// Stop everything. Blocks until the worker thread has exited.
    ///
    /// After this returns no markup is published until the next
    /// [`activate`](Self::activate).
    pub fn teardown(&mut self) {
        if !self.is_active() {
            return;
        }

        self.clear_monitors();
        if let Some(mut worker) = self.worker.take() {
            worker.terminate();
        }
        // Whatever was delivered before the worker stopped is dropped here
        self.results = None;

        self.files.clear();
        self.documents.clear();
        self.repository = None;
        self.root = None;
        self.state = CoordinatorState::Inactive;
        tracing::info!("Status coordinator torn down");

        self.sink.request_refresh();
    }

    fn request_status(&mut self, location: &Location) {
        if self.state != CoordinatorState::RepositoryBound {
            return;
        }
        let Some(path) = location.as_path() else {
            return;
        };
        if !self.files.contains_key(location) {
            return;
        }

        // Nested repositories and submodules answer for their own files
        let repository = self
            .resolver
            .borrow_mut()
            .resolve(location, false)
            .or_else(|| self.repository.clone());

        let Some(worker) = self.worker.as_mut() else {
            return;
        };
        let request = worker.push(repository.as_ref(), path);

        if let (Some(request), Some(file)) = (request, self.files.get_mut(location)) {
            file.latest_request = Some(request);
        }
    }

    /// Validate a delivered result and publish it. Returns whether it was
    /// published.
    fn apply_result(&mut self, result: &StatusResult) -> bool {
        let Some(worker) = self.worker.as_ref() else {
            return false;
        };
        if result.generation != worker.generation() {
            tracing::trace!("Dropping result from a previous root: {}", result.path.display());
            return false;
        }

        let location = Location::from(result.path.as_path());
        let Some(file) = self.files.get(&location) else {
            return false;
        };
        if file.latest_request != Some(result.request) {
            return false;
        }

        let document = self.documents.get(&location).copied();
        let flags = StatusFlags::merge_unknown_with_document(result.flags, document);
        let markup = render_markup(&file.display_name, flags);
        self.sink.set_markup(file.display_id, &markup);
        true
    }

    fn monitor_directory(&mut self, dir: &Path) {
        if self.monitors.contains_key(dir) {
            return;
        }

        match self.watcher.watch(dir) {
            Ok(handle) => {
                self.monitors.insert(dir.to_path_buf(), handle);
            }
            Err(e) => {
                tracing::warn!("{}; {} will not be monitored", e, dir.display());
            }
        }
    }

    fn clear_monitors(&mut self) {
        for (_, handle) in self.monitors.drain() {
            self.watcher.cancel(handle);
        }
    }
}

impl Drop for StatusCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}
