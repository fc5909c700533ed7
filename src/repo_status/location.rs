//! Locations reported by the host.
//!
//! The host hands us either plain paths or URIs. Only local paths can be
//! resolved; anything else is kept around so it can still be tracked, but
//! never reaches repository discovery.

use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// A file or directory location as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// A path on a local filesystem.
    Local(PathBuf),
    /// A URI with a non-`file` scheme (sftp, smb, ...).
    Remote(Url),
}

impl Location {
    /// Parse a host location string.
    ///
    /// `file://` URIs become local paths. Strings without a scheme, and
    /// Windows drive prefixes such as `C:\`, are taken as paths.
    pub fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => Location::Local(path),
                Err(()) => Location::Remote(url),
            },
            Ok(url) if url.scheme().len() > 1 => Location::Remote(url),
            _ => Location::Local(PathBuf::from(raw)),
        }
    }

    /// The local path, if this location has one.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Location::Local(path) => Some(path),
            Location::Remote(_) => None,
        }
    }

    /// Whether discovery may run for this location.
    pub fn is_local(&self) -> bool {
        matches!(self, Location::Local(_))
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Location::Local(path)
    }
}

impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Location::Local(path.to_path_buf())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Remote(url) => write!(f, "{url}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_path() {
        let location = Location::parse("/home/user/project/main.rs");
        assert_eq!(
            location,
            Location::Local(PathBuf::from("/home/user/project/main.rs"))
        );
    }

    #[test]
    fn test_parse_file_uri() {
        let location = Location::parse("file:///tmp/a%20b/c.txt");
        assert_eq!(location, Location::Local(PathBuf::from("/tmp/a b/c.txt")));
        assert!(location.is_local());
    }

    #[test]
    fn test_parse_remote_uri() {
        let location = Location::parse("sftp://host/srv/repo/file.txt");
        assert!(!location.is_local());
        assert!(location.as_path().is_none());
    }

    #[test]
    fn test_parse_drive_letter_is_local() {
        let location = Location::parse("C:\\src\\repo");
        assert!(location.is_local());
    }
}
