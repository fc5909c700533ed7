//! Directory watching with debouncing.
//!
//! The coordinator only depends on the [`DirectoryWatcher`] contract.
//! [`NotifyDirectoryWatcher`] implements it on top of `notify`, watching one
//! directory at a time (non-recursively, the file browser inserts the
//! directories it shows) and coalescing rapid events per path.

use notify::{
    event::ModifyKind, Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that can occur in the directory watcher.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// The platform watcher could not be created.
    #[error("Failed to create watcher: {0}")]
    WatcherCreation(#[from] notify::Error),

    /// A directory could not be watched.
    #[error("Failed to watch path {path}: {source}")]
    WatchPath {
        /// The directory that was asked for.
        path: PathBuf,
        /// Why `notify` refused it.
        source: notify::Error,
    },
}

/// Identifies one active watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(pub u64);

/// Kinds of directory change the coordinator distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A new entry appeared.
    Created,
    /// An entry went away.
    Deleted,
    /// Content or metadata changed, or the entry was replaced.
    Changed,
    /// An entry was renamed.
    Renamed,
}

impl From<EventKind> for ChangeKind {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Renamed,
            EventKind::Modify(_) => ChangeKind::Changed,
            EventKind::Remove(_) => ChangeKind::Deleted,
            _ => ChangeKind::Changed,
        }
    }
}

/// A coalesced change to one path.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryChangeEvent {
    /// Path of the changed entry.
    pub path: PathBuf,
    /// What happened to it.
    pub kind: ChangeKind,
    /// When the latest raw event for it arrived.
    pub timestamp: Instant,
}

/// Filesystem watching as seen by the coordinator.
pub trait DirectoryWatcher {
    /// Start watching the immediate contents of `dir`.
    fn watch(&mut self, dir: &Path) -> Result<WatchHandle, WatcherError>;

    /// Stop a watch. Unknown handles are ignored.
    fn cancel(&mut self, handle: WatchHandle);

    /// Events that became ready since the last call. Never blocks.
    fn poll_events(&mut self) -> Vec<DirectoryChangeEvent>;
}

/// A `notify` backed watcher with event debouncing.
pub struct NotifyDirectoryWatcher {
    watcher: RecommendedWatcher,
    event_rx: Receiver<Result<Event, notify::Error>>,
    watches: HashMap<WatchHandle, PathBuf>,
    next_handle: u64,
    pending_events: HashMap<PathBuf, DirectoryChangeEvent>,
    debounce_duration: Duration,
    last_flush: Instant,
}

impl NotifyDirectoryWatcher {
    /// Creates a new watcher.
    ///
    /// # Arguments
    /// * `debounce` - Minimum time between event batches (recommended: 100-300ms)
    pub fn new(debounce: Duration) -> Result<Self, WatcherError> {
        let (tx, rx) = channel();

        let config = Config::default()
            .with_poll_interval(Duration::from_millis(100))
            .with_compare_contents(false);

        let watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                let _ = tx.send(res);
            },
            config,
        )?;

        Ok(Self {
            watcher,
            event_rx: rx,
            watches: HashMap::new(),
            next_handle: 0,
            pending_events: HashMap::new(),
            debounce_duration: debounce,
            last_flush: Instant::now(),
        })
    }

    /// Number of active watches.
    pub fn watch_count(&self) -> usize {
        self.watches.len()
    }

    /// Drain raw events from `notify` into the pending set.
    fn collect_raw_events(&mut self) {
        while let Ok(result) = self.event_rx.try_recv() {
            match result {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        continue;
                    }
                    let kind = ChangeKind::from(event.kind);
                    for path in event.paths {
                        let change = DirectoryChangeEvent {
                            path: path.clone(),
                            kind,
                            timestamp: Instant::now(),
                        };
                        Self::merge_event(&mut self.pending_events, change);
                    }
                }
                Err(e) => tracing::warn!("Watcher error: {}", e),
            }
        }
    }

    /// Fold `event` into `pending`.
    ///
    /// Rules:
    /// - DELETED followed by CREATED = CHANGED (file was replaced, e.g. an
    ///   atomic save)
    /// - Otherwise the most recent event wins
    fn merge_event(pending: &mut HashMap<PathBuf, DirectoryChangeEvent>, event: DirectoryChangeEvent) {
        pending
            .entry(event.path.clone())
            .and_modify(|existing| {
                if existing.kind == ChangeKind::Deleted && event.kind == ChangeKind::Created {
                    existing.kind = ChangeKind::Changed;
                    existing.timestamp = event.timestamp;
                } else if event.timestamp >= existing.timestamp {
                    *existing = event.clone();
                }
            })
            .or_insert(event);
    }

    fn coalesce_events(events: Vec<DirectoryChangeEvent>) -> Vec<DirectoryChangeEvent> {
        let mut by_path = HashMap::new();
        for event in events {
            Self::merge_event(&mut by_path, event);
        }
        by_path.into_values().collect()
    }
}

impl DirectoryWatcher for NotifyDirectoryWatcher {
    fn watch(&mut self, dir: &Path) -> Result<WatchHandle, WatcherError> {
        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatcherError::WatchPath {
                path: dir.to_path_buf(),
                source: e,
            })?;

        let handle = WatchHandle(self.next_handle);
        self.next_handle += 1;
        self.watches.insert(handle, dir.to_path_buf());
        tracing::debug!("Watching {}", dir.display());
        Ok(handle)
    }

    fn cancel(&mut self, handle: WatchHandle) {
        let Some(dir) = self.watches.remove(&handle) else {
            return;
        };

        // The same directory may be watched twice; notify only knows paths.
        if self.watches.values().any(|other| *other == dir) {
            return;
        }

        if let Err(e) = self.watcher.unwatch(&dir) {
            tracing::debug!("Failed to unwatch {}: {}", dir.display(), e);
        }
    }

    fn poll_events(&mut self) -> Vec<DirectoryChangeEvent> {
        self.collect_raw_events();

        if self.pending_events.is_empty() {
            return Vec::new();
        }

        let now = Instant::now();
        if now.duration_since(self.last_flush) < self.debounce_duration {
            return Vec::new(); // Still in debounce period
        }
        self.last_flush = now;

        let events: Vec<_> = self.pending_events.drain().map(|(_, e)| e).collect();
        Self::coalesce_events(events)
    }
}
