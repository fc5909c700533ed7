//! Directory-to-repository resolution with a bounded LRU cache.
//!
//! Every directory we have asked about maps to either a repository handle
//! or a negative entry. A successful discovery backfills the whole chain of
//! directories between the queried one and the working directory, so files
//! elsewhere in the same tree resolve without another discovery walk.

use crate::repo_status::error::StatusError;
use crate::repo_status::location::Location;
use crate::repo_status::vcs::{RepositoryHandle, VcsBackend, WeakRepositoryHandle};
use lru::LruCache;
use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A resolver shared by every window of one application.
///
/// Resolution only ever runs on the UI-bound context, so this is not
/// `Send`.
pub type SharedResolver = Rc<RefCell<RepositoryResolver>>;

/// What the cache knows about a directory.
#[derive(Clone)]
enum CacheEntry {
    Repository(RepositoryHandle),
    NotARepository,
}

/// Statistics about resolver behavior.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolverStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to run discovery.
    pub misses: u64,
    /// Calls into the discovery primitive.
    pub discoveries: u64,
    /// Repositories opened (as opposed to reused).
    pub opens: u64,
    /// Negative entries recorded.
    pub negative_entries: u64,
    /// Entries evicted by the LRU bound.
    pub evictions: u64,
}

/// Finds and caches the repository enclosing a location.
pub struct RepositoryResolver {
    backend: Box<dyn VcsBackend>,
    /// Directory to repository (or sentinel), bounded by `capacity`.
    entries: LruCache<PathBuf, CacheEntry>,
    /// Opened repositories by git directory. Weak so that eviction from
    /// `entries` can actually close them.
    open_repositories: HashMap<PathBuf, WeakRepositoryHandle>,
    capacity: usize,
    stats: ResolverStats,
}

impl RepositoryResolver {
    /// Create a resolver caching at most `capacity` directories.
    pub fn new(backend: Box<dyn VcsBackend>, capacity: usize) -> Self {
        Self {
            backend,
            entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            open_repositories: HashMap::new(),
            capacity,
            stats: ResolverStats::default(),
        }
    }

    /// Wrap into the shared form used by the registry.
    pub fn shared(self) -> SharedResolver {
        Rc::new(RefCell::new(self))
    }

    /// Number of cached directories.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no directory is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached directories.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get resolver statistics.
    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    /// Whether `dir` has a cache entry, positive or negative.
    pub fn is_cached(&self, dir: &Path) -> bool {
        self.entries.contains(dir)
    }

    /// Drop every cached directory.
    ///
    /// Repositories still held elsewhere (another window, a queued request)
    /// stay reusable, so the next resolution hands out the same handle.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.open_repositories.retain(|_, weak| weak.is_alive());
    }

    /// Resolve the repository enclosing `location`.
    ///
    /// `is_dir` tells whether `location` is a directory; for files the
    /// parent directory is looked up. Remote locations never resolve.
    pub fn resolve(&mut self, location: &Location, is_dir: bool) -> Option<RepositoryHandle> {
        let path = match location {
            Location::Local(path) => path,
            Location::Remote(url) => {
                let skipped = StatusError::RemoteScheme {
                    location: url.to_string(),
                };
                tracing::trace!("{}", skipped);
                return None;
            }
        };

        let dir = if is_dir {
            path.as_path()
        } else {
            path.parent()?
        };

        // Fast path
        if let Some(entry) = self.entries.get(dir) {
            self.stats.hits += 1;
            return match entry {
                CacheEntry::Repository(handle) => Some(handle.clone()),
                CacheEntry::NotARepository => None,
            };
        }
        self.stats.misses += 1;

        let handle = match self.discover_and_open(dir) {
            Some(handle) => handle,
            None => {
                // Only this directory: a sibling may still be in another repo.
                self.insert(dir.to_path_buf(), CacheEntry::NotARepository);
                self.stats.negative_entries += 1;
                return None;
            }
        };

        self.backfill(dir, &handle);
        Some(handle)
    }

    fn discover_and_open(&mut self, dir: &Path) -> Option<RepositoryHandle> {
        self.stats.discoveries += 1;
        let git_dir = match self.backend.discover(dir) {
            Ok(git_dir) => git_dir,
            Err(e) => {
                tracing::debug!("{}", e);
                return None;
            }
        };

        // Reuse the repository if it is still open somewhere
        if let Some(handle) = self
            .open_repositories
            .get(&git_dir)
            .and_then(WeakRepositoryHandle::upgrade)
        {
            return Some(handle).filter(|h| h.workdir().is_some());
        }

        let handle = match self.backend.open(&git_dir) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("Failed to open repository {}: {}", git_dir.display(), e);
                return None;
            }
        };
        self.stats.opens += 1;

        self.open_repositories.retain(|_, weak| weak.is_alive());
        self.open_repositories.insert(git_dir, handle.downgrade());

        if handle.workdir().is_none() {
            tracing::debug!("{} is a bare repository, ignoring", handle.git_dir().display());
            return None;
        }

        Some(handle)
    }

    /// Cache `handle` for `dir` and each ancestor still inside the working
    /// directory. The prefix test is on path components, not on resolved
    /// paths, so a symlink pointing into the repository is not cached.
    fn backfill(&mut self, dir: &Path, handle: &RepositoryHandle) {
        let Some(workdir) = handle.workdir().map(Path::to_path_buf) else {
            return;
        };

        let mut current = Some(dir);
        while let Some(ancestor) = current {
            if !ancestor.starts_with(&workdir) {
                break;
            }
            self.insert(ancestor.to_path_buf(), CacheEntry::Repository(handle.clone()));
            current = ancestor.parent();
        }
    }

    fn insert(&mut self, dir: PathBuf, entry: CacheEntry) {
        if let Some((evicted, _)) = self.entries.push(dir.clone(), entry) {
            if evicted != dir {
                self.stats.evictions += 1;
            }
        }
    }

    /// Get a summary of the cache for debugging.
    pub fn debug_summary(&self) -> String {
        format!(
            "RepositoryResolver: {} entries (max: {}), {} open repositories, stats: {:?}",
            self.entries.len(),
            self.capacity,
            self.open_repositories.len(),
            self.stats
        )
    }
}
