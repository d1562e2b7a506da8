//! Version control access
//!
//! The checker only needs two things from a repository: the metadata of a minor
//! version (most importantly its parents) and a breadth-first walk over the
//! history. Backends implement [`VersionControl`]; [`open`] picks one by name.

pub mod git;
pub mod memory;

pub use git::GitRepository;
pub use memory::InMemoryRepository;

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Names accepted by [`open`]
pub const SUPPORTED_BACKENDS: &[&str] = &["git"];

/// Version control errors
#[derive(Debug, Error)]
pub enum VcsError {
    /// Backend command failed with an error message
    #[error("VCS command failed: {0}")]
    CommandFailed(String),

    /// The reference does not name a minor version
    #[error("'{reference}' does not name a minor version")]
    InvalidReference {
        /// Reference as given by the caller
        reference: String,
    },

    /// The path is not inside a repository
    #[error("not a repository: {}", path.display())]
    NotARepository {
        /// Repository path
        path: PathBuf,
    },

    /// Backend output contained invalid UTF-8
    #[error("invalid UTF-8 in VCS output")]
    InvalidUtf8,

    /// No backend registered under this name
    #[error("unsupported VCS type '{name}'")]
    UnsupportedBackend {
        /// Requested backend name
        name: String,
    },

    /// IO error occurred while running the backend
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata of one minor version (commit)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinorVersion {
    /// Full checksum
    pub checksum: String,
    /// Parent checksums, first parent first
    pub parents: Vec<String>,
    /// Author name
    pub author: String,
    /// Author email
    pub email: String,
    /// Author date, ISO 8601
    pub date: String,
    /// First line of the description
    pub description: String,
}

impl MinorVersion {
    /// Abbreviated checksum for display
    pub fn short_checksum(&self) -> &str {
        short(&self.checksum)
    }
}

/// Abbreviate a checksum to at most 7 characters
pub fn short(checksum: &str) -> &str {
    checksum.get(..7).unwrap_or(checksum)
}

/// Capability the checker needs from a version control system
pub trait VersionControl {
    /// Resolve a reference (checksum, branch, tag, `HEAD`) to its minor version
    fn get_minor_version_info(&self, reference: &str) -> Result<MinorVersion, VcsError>;

    /// Walk the history from `head` breadth-first, yielding each checksum once
    ///
    /// The walk is lazy and independent of any other walk on the same backend.
    fn walk(&self, head: &str) -> MinorVersionWalk<'_, Self>
    where
        Self: Sized,
    {
        MinorVersionWalk::new(self, head)
    }
}

impl<T: VersionControl + ?Sized> VersionControl for Box<T> {
    fn get_minor_version_info(&self, reference: &str) -> Result<MinorVersion, VcsError> {
        (**self).get_minor_version_info(reference)
    }
}

impl<T: VersionControl + ?Sized> VersionControl for &T {
    fn get_minor_version_info(&self, reference: &str) -> Result<MinorVersion, VcsError> {
        (**self).get_minor_version_info(reference)
    }
}

/// Lazy breadth-first iterator over minor versions
///
/// Stops after yielding the first error.
pub struct MinorVersionWalk<'a, V: ?Sized> {
    vcs: &'a V,
    queue: VecDeque<String>,
    visited: HashSet<String>,
}

impl<'a, V: VersionControl + ?Sized> MinorVersionWalk<'a, V> {
    fn new(vcs: &'a V, head: &str) -> Self {
        Self {
            vcs,
            queue: VecDeque::from([head.to_string()]),
            visited: HashSet::new(),
        }
    }
}

impl<V: VersionControl + ?Sized> Iterator for MinorVersionWalk<'_, V> {
    type Item = Result<MinorVersion, VcsError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(reference) = self.queue.pop_front() {
            let minor = match self.vcs.get_minor_version_info(&reference) {
                Ok(minor) => minor,
                Err(e) => {
                    self.queue.clear();
                    return Some(Err(e));
                }
            };
            if !self.visited.insert(minor.checksum.clone()) {
                continue;
            }
            for parent in &minor.parents {
                if !self.visited.contains(parent) {
                    self.queue.push_back(parent.clone());
                }
            }
            return Some(Ok(minor));
        }
        None
    }
}

/// Open the repository at `path` with the named backend
///
/// # Examples
///
/// ```
/// use perfcheck::vcs::{self, VcsError};
///
/// let err = vcs::open("svn", std::path::Path::new(".")).err().unwrap();
/// assert!(matches!(err, VcsError::UnsupportedBackend { .. }));
/// ```
pub fn open(kind: &str, path: &Path) -> Result<Box<dyn VersionControl>, VcsError> {
    match kind {
        "git" => Ok(Box::new(GitRepository::open(path))),
        other => Err(VcsError::UnsupportedBackend {
            name: other.to_string(),
        }),
    }
}
