//! The version-control collaborator.
//!
//! Discovery and opening happen on the UI-bound context through
//! [`VcsBackend`]. Status queries happen on the worker thread through the
//! [`Repository`] behind a [`RepositoryHandle`], which is why repositories
//! must be `Send + Sync` while backends need not be.

use crate::repo_status::error::StatusError;
use crate::repo_status::status::StatusFlags;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

/// An opened repository.
pub trait Repository: Send + Sync {
    /// The repository's git directory, used as its identity.
    fn git_dir(&self) -> &Path;

    /// Root of the checked-out tree, `None` for bare repositories.
    fn workdir(&self) -> Option<&Path>;

    /// Status of an absolute path inside the working directory.
    fn status(&self, path: &Path) -> Result<StatusFlags, StatusError>;
}

/// Repository discovery and opening.
pub trait VcsBackend {
    /// Find the git directory governing `dir`, walking upwards.
    fn discover(&self, dir: &Path) -> Result<PathBuf, StatusError>;

    /// Open the repository whose git directory is `git_dir`.
    fn open(&self, git_dir: &Path) -> Result<RepositoryHandle, StatusError>;
}

/// Shared reference to an opened repository.
#[derive(Clone)]
pub struct RepositoryHandle {
    inner: Arc<dyn Repository>,
}

impl RepositoryHandle {
    /// Wrap an opened repository.
    pub fn new(repository: impl Repository + 'static) -> Self {
        Self {
            inner: Arc::new(repository),
        }
    }

    /// Repository metadata directory.
    pub fn git_dir(&self) -> &Path {
        self.inner.git_dir()
    }

    /// Working directory, `None` for bare repositories.
    pub fn workdir(&self) -> Option<&Path> {
        self.inner.workdir()
    }

    /// Query the status of `path`. Blocking; call from the worker.
    pub fn status(&self, path: &Path) -> Result<StatusFlags, StatusError> {
        self.inner.status(path)
    }

    /// Whether both handles refer to the same opened repository.
    pub fn same_repository(&self, other: &RepositoryHandle) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }

    pub(crate) fn downgrade(&self) -> WeakRepositoryHandle {
        WeakRepositoryHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("git_dir", &self.git_dir())
            .field("workdir", &self.workdir())
            .finish()
    }
}

/// A handle that does not keep its repository open.
#[derive(Clone)]
pub(crate) struct WeakRepositoryHandle {
    inner: Weak<dyn Repository>,
}

impl WeakRepositoryHandle {
    pub(crate) fn upgrade(&self) -> Option<RepositoryHandle> {
        self.inner.upgrade().map(|inner| RepositoryHandle { inner })
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}
