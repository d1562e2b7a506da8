//! Profile and change-list storage
//!
//! Profiles are registered per minor version and indexed by their
//! configuration tuple. Detected changes are kept in one list per minor
//! version that is merged on every save.

pub mod fs;

pub use fs::{FsProfileStore, STORE_DIR};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::check::DetectedChange;
use crate::profile::{ConfigTuple, Profile};

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced profile is missing or unreadable
    #[error("profile {reference} not found: {reason}")]
    NotFound {
        /// Reference that failed to load
        reference: String,
        /// Why loading failed
        reason: String,
    },

    /// A stored index or change list cannot be parsed
    #[error("corrupt store file {}: {reason}", path.display())]
    Corrupt {
        /// Path of the damaged file
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Filesystem operation failed
    #[error("I/O error while {context}")]
    Io {
        /// What the store was doing
        context: String,
        #[source]
        /// IO error source
        source: std::io::Error,
    },

    /// Serialization of stored data failed
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Handle of one stored profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRef {
    /// Minor version the profile belongs to
    pub checksum: String,
    /// Configuration of the profile
    pub config: ConfigTuple,
    /// Object name inside the minor version's directory
    pub file: String,
}

impl std::fmt::Display for ProfileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", crate::vcs::short(&self.checksum), self.file)
    }
}

/// Profiles of one minor version keyed by configuration
pub type ProfileIndex = BTreeMap<ConfigTuple, ProfileRef>;

/// Storage capability used by the checker
pub trait ProfileStore {
    /// Profiles stored for a minor version, at most one per configuration
    fn list_profiles(&self, checksum: &str) -> Result<ProfileIndex, StoreError>;

    /// Load a profile, failing with [`StoreError::NotFound`] if it is missing or corrupt
    fn load(&self, reference: &ProfileRef) -> Result<Profile, StoreError>;

    /// Merge `changes` into the change list of a minor version
    fn save_changes(&self, checksum: &str, changes: &[DetectedChange]) -> Result<(), StoreError>;

    /// Change list of a minor version, empty when none was saved
    fn load_changes(&self, checksum: &str) -> Result<Vec<DetectedChange>, StoreError>;
}

impl<T: ProfileStore + ?Sized> ProfileStore for &T {
    fn list_profiles(&self, checksum: &str) -> Result<ProfileIndex, StoreError> {
        (**self).list_profiles(checksum)
    }

    fn load(&self, reference: &ProfileRef) -> Result<Profile, StoreError> {
        (**self).load(reference)
    }

    fn save_changes(&self, checksum: &str, changes: &[DetectedChange]) -> Result<(), StoreError> {
        (**self).save_changes(checksum, changes)
    }

    fn load_changes(&self, checksum: &str) -> Result<Vec<DetectedChange>, StoreError> {
        (**self).load_changes(checksum)
    }
}

/// Merge new changes into stored ones
///
/// One record is kept per (location, type, command string); later records
/// win. The result is sorted by that key.
pub fn merge_changes(
    stored: Vec<DetectedChange>,
    new: &[DetectedChange],
) -> Vec<DetectedChange> {
    let mut merged: BTreeMap<(String, String, String), DetectedChange> = BTreeMap::new();
    for change in stored.into_iter().chain(new.iter().cloned()) {
        let (location, kind, command) = change.merge_key();
        let key = (location.to_string(), kind.to_string(), command.to_string());
        merged.insert(key, change);
    }
    merged.into_values().collect()
}
