//! In-memory collaborators for tests.

use crate::repo_status::coordinator::{DisplayId, MarkupSink};
use crate::repo_status::error::StatusError;
use crate::repo_status::status::StatusFlags;
use crate::repo_status::vcs::{Repository, RepositoryHandle, VcsBackend};
use crate::repo_status::watcher::{
    ChangeKind, DirectoryChangeEvent, DirectoryWatcher, WatchHandle, WatcherError,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Poll `condition` for up to five seconds.
pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[derive(Default)]
struct FakeVcsState {
    /// git dir -> workdir (None for bare)
    repositories: HashMap<PathBuf, Option<PathBuf>>,
    /// Path prefixes that discovery follows elsewhere, like symlinks
    aliases: Vec<(PathBuf, PathBuf)>,
    discover_calls: usize,
    open_calls: usize,
}

/// Statuses and query knobs shared with every opened fake repository.
#[derive(Default)]
struct FakeStatusState {
    statuses: HashMap<PathBuf, StatusFlags>,
    failing: HashSet<PathBuf>,
    delay: Duration,
    calls: usize,
    last_workdir: Option<PathBuf>,
}

/// A version-control backend over an in-memory set of repositories.
#[derive(Clone, Default)]
pub(crate) struct FakeVcs {
    state: Arc<Mutex<FakeVcsState>>,
    status: Arc<Mutex<FakeStatusState>>,
}

impl FakeVcs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a repository with working directory `workdir` and return
    /// an opened handle to it.
    pub(crate) fn add_repository(&self, workdir: &str) -> RepositoryHandle {
        let workdir = PathBuf::from(workdir);
        let git_dir = workdir.join(".git");
        self.state
            .lock()
            .unwrap()
            .repositories
            .insert(git_dir.clone(), Some(workdir.clone()));
        self.handle(git_dir, Some(workdir))
    }

    pub(crate) fn add_bare_repository(&self, git_dir: &str) {
        self.state
            .lock()
            .unwrap()
            .repositories
            .insert(PathBuf::from(git_dir), None);
    }

    /// Make discovery treat `from` as if it were `to`.
    pub(crate) fn alias(&self, from: &str, to: &str) {
        self.state
            .lock()
            .unwrap()
            .aliases
            .push((PathBuf::from(from), PathBuf::from(to)));
    }

    pub(crate) fn set_status(&self, path: &str, flags: StatusFlags) {
        self.status
            .lock()
            .unwrap()
            .statuses
            .insert(PathBuf::from(path), flags);
    }

    pub(crate) fn fail_status(&self, path: &str) {
        self.status.lock().unwrap().failing.insert(PathBuf::from(path));
    }

    /// How long each status query blocks.
    pub(crate) fn set_delay(&self, delay: Duration) {
        self.status.lock().unwrap().delay = delay;
    }

    pub(crate) fn discover_calls(&self) -> usize {
        self.state.lock().unwrap().discover_calls
    }

    pub(crate) fn open_calls(&self) -> usize {
        self.state.lock().unwrap().open_calls
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status.lock().unwrap().calls
    }

    pub(crate) fn last_queried_workdir(&self) -> Option<PathBuf> {
        self.status.lock().unwrap().last_workdir.clone()
    }

    fn handle(&self, git_dir: PathBuf, workdir: Option<PathBuf>) -> RepositoryHandle {
        RepositoryHandle::new(FakeRepository {
            git_dir,
            workdir,
            status: Arc::clone(&self.status),
        })
    }
}

impl VcsBackend for FakeVcs {
    fn discover(&self, dir: &Path) -> Result<PathBuf, StatusError> {
        let mut state = self.state.lock().unwrap();
        state.discover_calls += 1;

        let mut target = dir.to_path_buf();
        for (from, to) in &state.aliases {
            if let Ok(rest) = dir.strip_prefix(from) {
                target = to.join(rest);
            }
        }

        for ancestor in target.ancestors() {
            for (git_dir, workdir) in &state.repositories {
                let root = workdir.as_deref().unwrap_or(git_dir);
                if root == ancestor {
                    return Ok(git_dir.clone());
                }
            }
        }

        Err(StatusError::NotFound {
            path: dir.to_path_buf(),
        })
    }

    fn open(&self, git_dir: &Path) -> Result<RepositoryHandle, StatusError> {
        let workdir = {
            let mut state = self.state.lock().unwrap();
            state.open_calls += 1;
            state
                .repositories
                .get(git_dir)
                .cloned()
                .ok_or_else(|| StatusError::NotFound {
                    path: git_dir.to_path_buf(),
                })?
        };
        Ok(self.handle(git_dir.to_path_buf(), workdir))
    }
}

struct FakeRepository {
    git_dir: PathBuf,
    workdir: Option<PathBuf>,
    status: Arc<Mutex<FakeStatusState>>,
}

impl Repository for FakeRepository {
    fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    fn status(&self, path: &Path) -> Result<StatusFlags, StatusError> {
        let delay = self.status.lock().unwrap().delay;
        std::thread::sleep(delay);

        let mut state = self.status.lock().unwrap();
        state.calls += 1;
        state.last_workdir = self.workdir.clone();

        if state.failing.contains(path) {
            return Err(StatusError::Poisoned);
        }
        Ok(state.statuses.get(path).copied().unwrap_or_default())
    }
}

#[derive(Default)]
struct FakeWatcherState {
    active: HashMap<WatchHandle, PathBuf>,
    failing: HashSet<PathBuf>,
    events: VecDeque<DirectoryChangeEvent>,
    next_handle: u64,
}

/// A directory watcher that records watches and replays queued events.
#[derive(Clone, Default)]
pub(crate) struct FakeWatcher {
    state: Arc<Mutex<FakeWatcherState>>,
}

impl FakeWatcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_on(&self, dir: &str) {
        self.state.lock().unwrap().failing.insert(PathBuf::from(dir));
    }

    pub(crate) fn emit(&self, path: &str, kind: ChangeKind) {
        self.state.lock().unwrap().events.push_back(DirectoryChangeEvent {
            path: PathBuf::from(path),
            kind,
            timestamp: Instant::now(),
        });
    }

    pub(crate) fn is_watching(&self, dir: &Path) -> bool {
        self.state.lock().unwrap().active.values().any(|d| d == dir)
    }

    pub(crate) fn active_count(&self) -> usize {
        self.state.lock().unwrap().active.len()
    }
}

impl DirectoryWatcher for FakeWatcher {
    fn watch(&mut self, dir: &Path) -> Result<WatchHandle, WatcherError> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(dir) {
            return Err(WatcherError::WatchPath {
                path: dir.to_path_buf(),
                source: notify::Error::generic("permission denied"),
            });
        }

        let handle = WatchHandle(state.next_handle);
        state.next_handle += 1;
        state.active.insert(handle, dir.to_path_buf());
        Ok(handle)
    }

    fn cancel(&mut self, handle: WatchHandle) {
        self.state.lock().unwrap().active.remove(&handle);
    }

    fn poll_events(&mut self) -> Vec<DirectoryChangeEvent> {
        self.state.lock().unwrap().events.drain(..).collect()
    }
}

/// A markup sink that remembers everything it was told.
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    updates: Arc<Mutex<Vec<(DisplayId, String)>>>,
    refreshes: Arc<Mutex<usize>>,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn updates(&self) -> Vec<(DisplayId, String)> {
        self.updates.lock().unwrap().clone()
    }

    /// Latest markup published for `id`.
    pub(crate) fn markup_for(&self, id: DisplayId) -> Option<String> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(update_id, _)| *update_id == id)
            .map(|(_, markup)| markup.clone())
    }

    pub(crate) fn refresh_count(&self) -> usize {
        *self.refreshes.lock().unwrap()
    }
}

impl MarkupSink for RecordingSink {
    fn set_markup(&mut self, id: DisplayId, markup: &str) {
        self.updates.lock().unwrap().push((id, markup.to_string()));
    }

    fn request_refresh(&mut self) {
        *self.refreshes.lock().unwrap() += 1;
    }
}
