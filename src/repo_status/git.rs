//! `git2` implementation of the version-control collaborator.

use crate::repo_status::error::StatusError;
use crate::repo_status::status::StatusFlags;
use crate::repo_status::vcs::{Repository, RepositoryHandle, VcsBackend};
use git2::Status;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Discovers and opens repositories with libgit2.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitBackend;

impl GitBackend {
    /// Create a backend.
    pub fn new() -> Self {
        Self
    }
}

impl VcsBackend for GitBackend {
    fn discover(&self, dir: &Path) -> Result<PathBuf, StatusError> {
        git2::Repository::discover_path(dir, std::iter::empty::<&OsStr>()).map_err(|e| {
            tracing::trace!("discovery failed for {}: {}", dir.display(), e);
            StatusError::NotFound {
                path: dir.to_path_buf(),
            }
        })
    }

    fn open(&self, git_dir: &Path) -> Result<RepositoryHandle, StatusError> {
        let repository = git2::Repository::open(git_dir)?;
        Ok(RepositoryHandle::new(GitRepository::new(repository)))
    }
}

/// An opened libgit2 repository.
///
/// `git2::Repository` is `Send` but not `Sync`, so queries are serialized
/// behind a mutex. In practice only the status worker ever queries it.
pub struct GitRepository {
    git_dir: PathBuf,
    workdir: Option<PathBuf>,
    repository: Mutex<git2::Repository>,
}

impl GitRepository {
    /// Wrap an opened libgit2 repository.
    pub fn new(repository: git2::Repository) -> Self {
        Self {
            git_dir: repository.path().to_path_buf(),
            workdir: repository.workdir().map(Path::to_path_buf),
            repository: Mutex::new(repository),
        }
    }
}

impl Repository for GitRepository {
    fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    fn status(&self, path: &Path) -> Result<StatusFlags, StatusError> {
        let workdir = self.workdir.as_deref().ok_or_else(|| StatusError::Bare {
            path: self.git_dir.clone(),
        })?;

        let relative = path
            .strip_prefix(workdir)
            .map_err(|_| StatusError::OutsideWorkdir {
                path: path.to_path_buf(),
                workdir: workdir.to_path_buf(),
            })?;

        let repository = self.repository.lock().map_err(|_| StatusError::Poisoned)?;
        let status = repository.status_file(relative)?;

        Ok(StatusFlags::from(status))
    }
}

impl From<Status> for StatusFlags {
    fn from(status: Status) -> Self {
        let mapping = [
            (Status::INDEX_NEW, StatusFlags::INDEX_NEW),
            (Status::INDEX_MODIFIED, StatusFlags::INDEX_MODIFIED),
            (Status::INDEX_RENAMED, StatusFlags::INDEX_MODIFIED),
            (Status::INDEX_TYPECHANGE, StatusFlags::INDEX_MODIFIED),
            (Status::INDEX_DELETED, StatusFlags::INDEX_DELETED),
            (Status::WT_NEW, StatusFlags::WORKING_TREE_NEW),
            (Status::WT_MODIFIED, StatusFlags::WORKING_TREE_MODIFIED),
            (Status::WT_RENAMED, StatusFlags::WORKING_TREE_MODIFIED),
            (Status::WT_TYPECHANGE, StatusFlags::WORKING_TREE_MODIFIED),
            (Status::WT_DELETED, StatusFlags::WORKING_TREE_DELETED),
            (Status::IGNORED, StatusFlags::IGNORED),
        ];

        mapping
            .into_iter()
            .filter(|(git, _)| status.contains(*git))
            .fold(StatusFlags::empty(), |acc, (_, flag)| acc | flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn commit_all(repo: &git2::Repository, message: &str) {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap();
    }

    #[test]
    fn test_discover_and_open() {
        let temp = tempdir().unwrap();
        git2::Repository::init(temp.path()).unwrap();
        let nested = temp.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();

        let backend = GitBackend::new();
        let git_dir = backend.discover(&nested).unwrap();
        let handle = backend.open(&git_dir).unwrap();

        let workdir = handle.workdir().unwrap();
        assert_eq!(
            fs::canonicalize(workdir).unwrap(),
            fs::canonicalize(temp.path()).unwrap()
        );
    }

    #[test]
    fn test_discover_outside_repository() {
        let temp = tempdir().unwrap();
        let backend = GitBackend::new();
        // tempdir may itself live under a checkout on some machines
        if git2::Repository::discover(temp.path()).is_err() {
            assert!(matches!(
                backend.discover(temp.path()),
                Err(StatusError::NotFound { .. })
            ));
        }
    }

    #[test]
    fn test_status_of_new_modified_and_ignored_files() {
        let temp = tempdir().unwrap();
        let repo = git2::Repository::init(temp.path()).unwrap();
        fs::write(temp.path().join(".gitignore"), "*.log\n").unwrap();
        fs::write(temp.path().join("tracked.txt"), "one").unwrap();
        commit_all(&repo, "initial");

        fs::write(temp.path().join("tracked.txt"), "two").unwrap();
        fs::write(temp.path().join("fresh.txt"), "new").unwrap();
        fs::write(temp.path().join("build.log"), "noise").unwrap();

        let backend = GitBackend::new();
        let handle = backend.open(repo.path()).unwrap();
        let workdir = handle.workdir().unwrap().to_path_buf();

        let modified = handle.status(&workdir.join("tracked.txt")).unwrap();
        assert!(modified.contains(StatusFlags::WORKING_TREE_MODIFIED));

        let fresh = handle.status(&workdir.join("fresh.txt")).unwrap();
        assert!(fresh.contains(StatusFlags::WORKING_TREE_NEW));

        let ignored = handle.status(&workdir.join("build.log")).unwrap();
        assert_eq!(ignored, StatusFlags::IGNORED);
    }

    #[test]
    fn test_status_outside_workdir() {
        let temp = tempdir().unwrap();
        let repo = git2::Repository::init(temp.path()).unwrap();
        let handle = GitBackend::new().open(repo.path()).unwrap();

        let result = handle.status(Path::new("/definitely/not/here.txt"));
        assert!(matches!(result, Err(StatusError::OutsideWorkdir { .. })));
    }

    #[test]
    fn test_flag_conversion() {
        let flags = StatusFlags::from(Status::INDEX_NEW | Status::WT_DELETED);
        assert_eq!(
            flags,
            StatusFlags::INDEX_NEW | StatusFlags::WORKING_TREE_DELETED
        );
        assert_eq!(StatusFlags::from(Status::CURRENT), StatusFlags::empty());
    }
}
