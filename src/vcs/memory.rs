//! In-memory repository for embedding and tests

use super::{MinorVersion, VcsError, VersionControl};
use std::collections::HashMap;

/// Commit graph held in memory
///
/// Every added commit becomes `HEAD`. Named references can be set with
/// [`InMemoryRepository::set_ref`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    commits: HashMap<String, MinorVersion>,
    refs: HashMap<String, String>,
}

impl InMemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a commit with the given parents and make it `HEAD`
    ///
    /// # Examples
    ///
    /// ```
    /// use perfcheck::vcs::{InMemoryRepository, VersionControl};
    ///
    /// let mut repo = InMemoryRepository::new();
    /// repo.add_commit("a1", &[]).add_commit("b2", &["a1"]);
    ///
    /// let head = repo.get_minor_version_info("HEAD").unwrap();
    /// assert_eq!(head.checksum, "b2");
    /// assert_eq!(head.parents, vec!["a1"]);
    /// ```
    pub fn add_commit(&mut self, checksum: &str, parents: &[&str]) -> &mut Self {
        self.insert(MinorVersion {
            checksum: checksum.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            author: "perfcheck".to_string(),
            email: "perfcheck@localhost".to_string(),
            date: String::new(),
            description: format!("commit {}", checksum),
        })
    }

    /// Add a fully described commit and make it `HEAD`
    pub fn insert(&mut self, minor: MinorVersion) -> &mut Self {
        self.refs.insert("HEAD".to_string(), minor.checksum.clone());
        self.commits.insert(minor.checksum.clone(), minor);
        self
    }

    /// Point a named reference at a checksum
    pub fn set_ref(&mut self, name: &str, checksum: &str) -> &mut Self {
        self.refs.insert(name.to_string(), checksum.to_string());
        self
    }

    /// Number of commits
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Whether the repository has no commits
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

impl VersionControl for InMemoryRepository {
    fn get_minor_version_info(&self, reference: &str) -> Result<MinorVersion, VcsError> {
        let checksum = self
            .refs
            .get(reference)
            .map(String::as_str)
            .unwrap_or(reference);
        self.commits
            .get(checksum)
            .cloned()
            .ok_or_else(|| VcsError::InvalidReference {
                reference: reference.to_string(),
            })
    }
}
