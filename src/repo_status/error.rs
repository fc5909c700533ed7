//! Error types for repository resolution and status queries.
//!
//! None of these escape to the host: the coordinator logs them and degrades
//! to "no markup". They exist so backends and tests can tell failures apart.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while resolving repositories or querying status.
#[derive(Error, Debug)]
pub enum StatusError {
    /// Discovery walked to the filesystem root without finding a repository.
    #[error("no repository found above {path}")]
    NotFound {
        /// Directory discovery started from.
        path: PathBuf,
    },

    /// The location is not locally addressable.
    #[error("{location} is not a local path, skipping discovery")]
    RemoteScheme {
        /// The location as the host gave it.
        location: String,
    },

    /// The repository has no working directory to report status for.
    #[error("repository at {path} has no working directory")]
    Bare {
        /// The repository's git directory.
        path: PathBuf,
    },

    /// A status query named a path outside the repository.
    #[error("{path} is outside the working directory {workdir}")]
    OutsideWorkdir {
        /// The queried path.
        path: PathBuf,
        /// The repository's working directory.
        workdir: PathBuf,
    },

    /// A query panicked while holding the repository.
    #[error("repository lock poisoned")]
    Poisoned,

    /// libgit2 reported an error.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// The worker thread could not be spawned.
    #[error("failed to start status worker: {0}")]
    Io(#[from] std::io::Error),
}
