//! Filesystem backed profile store
//!
//! Layout below the project root:
//!
//! ```text
//! .perfcheck/
//!   config.toml
//!   logs/<checksum>-precollect.log
//!   objects/<cs[..2]>/<cs[2..]>/index.json
//!   objects/<cs[..2]>/<cs[2..]>/<uuid>.perf
//!   objects/<cs[..2]>/<cs[2..]>.changes
//!   objects/short/<cs>/...
//! ```
//!
//! Checksums of two bytes or fewer live under `objects/short/`.
//!
//! Index and change-list files are replaced atomically through a temporary
//! file and a rename, so readers never see a partial write.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{merge_changes, ProfileIndex, ProfileRef, ProfileStore, StoreError};
use crate::check::DetectedChange;
use crate::infra::{FileSystem, RealFileSystem};
use crate::profile::{ConfigTuple, Profile};

/// Store directory below the project root
pub const STORE_DIR: &str = ".perfcheck";

const INDEX_FILE: &str = "index.json";

/// Directory for checksums too short to split
const SHORT_DIR: &str = "short";

#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    config: ConfigTuple,
    file: String,
}

/// Profile store persisted below `.perfcheck/`
pub struct FsProfileStore<FS: FileSystem = RealFileSystem> {
    root: PathBuf,
    fs: FS,
}

impl FsProfileStore<RealFileSystem> {
    /// Open the store of a project on the real filesystem
    pub fn open(project_root: &Path) -> Self {
        Self::with_fs(project_root, RealFileSystem)
    }
}

impl<FS: FileSystem> FsProfileStore<FS> {
    /// Open the store of a project with a custom filesystem implementation
    pub fn with_fs(project_root: &Path, fs: FS) -> Self {
        Self {
            root: project_root.join(STORE_DIR),
            fs,
        }
    }

    /// The `.perfcheck` directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory receiving pre-collection logs
    pub fn log_directory(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Location of a stored profile
    pub fn profile_path(&self, reference: &ProfileRef) -> PathBuf {
        self.object_dir(&reference.checksum).join(&reference.file)
    }

    fn object_dir(&self, checksum: &str) -> PathBuf {
        let objects = self.root.join("objects");
        if checksum.len() > 2 && checksum.is_char_boundary(2) {
            let (head, tail) = checksum.split_at(2);
            objects.join(head).join(tail)
        } else {
            // split heads are always two bytes long
            objects.join(SHORT_DIR).join(checksum)
        }
    }

    fn changes_path(&self, checksum: &str) -> PathBuf {
        let dir = self.object_dir(checksum);
        let mut name = dir.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".changes");
        dir.with_file_name(name)
    }

    /// Store a profile for a minor version and index it by configuration
    ///
    /// A profile of an already indexed configuration replaces the old index entry.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use perfcheck::profile::Profile;
    /// use perfcheck::store::{FsProfileStore, ProfileStore};
    /// use std::path::Path;
    ///
    /// let store = FsProfileStore::open(Path::new("."));
    /// let profile = Profile::from_json(&std::fs::read_to_string("run.perf")?)?;
    /// let reference = store.register("4f2a9c1d", &profile)?;
    /// assert_eq!(store.load(&reference)?, profile);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn register(&self, checksum: &str, profile: &Profile) -> Result<ProfileRef, StoreError> {
        let dir = self.object_dir(checksum);
        let file = format!("{}.perf", uuid::Uuid::new_v4());
        self.write_atomic(&dir.join(&file), &profile.to_json()?)?;

        let config = profile.config_tuple();
        let mut entries = self.read_index(checksum)?;
        entries.retain(|entry| entry.config != config);
        entries.push(IndexEntry {
            config: config.clone(),
            file: file.clone(),
        });
        self.write_atomic(&dir.join(INDEX_FILE), &serde_json::to_string_pretty(&entries)?)?;

        log::info!(
            "Registered profile {} for {} ({})",
            file,
            crate::vcs::short(checksum),
            config.to_cmdstr()
        );
        Ok(ProfileRef {
            checksum: checksum.to_string(),
            config,
            file,
        })
    }

    fn read_index(&self, checksum: &str) -> Result<Vec<IndexEntry>, StoreError> {
        let path = self.object_dir(checksum).join(INDEX_FILE);
        match self.read_optional(&path, "reading profile index")? {
            Some(contents) => serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                path,
                reason: e.to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }

    fn read_optional(&self, path: &Path, context: &str) -> Result<Option<String>, StoreError> {
        match self.fs.read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                context: format!("{} {}", context, path.display()),
                source,
            }),
        }
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> Result<(), StoreError> {
        let io_error = |context: &str, source| StoreError::Io {
            context: format!("{} {}", context, path.display()),
            source,
        };

        let parent = path.parent().unwrap_or(self.root.as_path());
        self.fs
            .create_dir_all(parent)
            .map_err(|e| io_error("creating directory for", e))?;

        let tmp = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        self.fs
            .write(&tmp, contents)
            .map_err(|e| io_error("writing temporary file for", e))?;
        if let Err(e) = self.fs.rename(&tmp, path) {
            // best effort, the rename error is what matters
            let _ = self.fs.remove_file(&tmp);
            return Err(io_error("replacing", e));
        }
        Ok(())
    }
}

impl<FS: FileSystem> ProfileStore for FsProfileStore<FS> {
    fn list_profiles(&self, checksum: &str) -> Result<ProfileIndex, StoreError> {
        Ok(self
            .read_index(checksum)?
            .into_iter()
            .map(|entry| {
                let reference = ProfileRef {
                    checksum: checksum.to_string(),
                    config: entry.config.clone(),
                    file: entry.file,
                };
                (entry.config, reference)
            })
            .collect())
    }

    fn load(&self, reference: &ProfileRef) -> Result<Profile, StoreError> {
        let path = self.profile_path(reference);
        let not_found = |reason: String| StoreError::NotFound {
            reference: reference.to_string(),
            reason,
        };

        let contents = self
            .fs
            .read_to_string(&path)
            .map_err(|e| not_found(e.to_string()))?;
        Profile::from_json(&contents).map_err(|e| not_found(format!("corrupt profile: {}", e)))
    }

    fn save_changes(&self, checksum: &str, changes: &[DetectedChange]) -> Result<(), StoreError> {
        let merged = merge_changes(self.load_changes(checksum)?, changes);
        log::debug!(
            "Saving {} change(s) for {}",
            merged.len(),
            crate::vcs::short(checksum)
        );
        self.write_atomic(
            &self.changes_path(checksum),
            &serde_json::to_string_pretty(&merged)?,
        )
    }

    fn load_changes(&self, checksum: &str) -> Result<Vec<DetectedChange>, StoreError> {
        let path = self.changes_path(checksum);
        match self.read_optional(&path, "reading change list")? {
            Some(contents) => serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                path,
                reason: e.to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{ChangeRecord, Confidence, PerformanceChange};
    use std::io;
    use tempfile::TempDir;

    fn profile(cmd: &str) -> Profile {
        Profile::from_json(&format!(
            r#"{{
                "header": {{"cmd": "{}"}},
                "collector_info": {{"name": "time"}},
                "resources": [{{"amount": 1.5, "uid": "main"}}]
            }}"#,
            cmd
        ))
        .unwrap()
    }

    fn change(location: &str) -> DetectedChange {
        DetectedChange {
            change: ChangeRecord {
                result: PerformanceChange::Degradation,
                kind: "constant".to_string(),
                location: location.to_string(),
                from_baseline: "1.00".to_string(),
                to_target: "3.00".to_string(),
                confidence: Confidence::RSquare(0.9),
                rate_degradation: 200.0,
            },
            command: "./run".to_string(),
            baseline_commit: "0011223344".to_string(),
        }
    }

    #[test]
    fn test_register_and_load_profile() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsProfileStore::open(temp_dir.path());

        let reference = store.register("abcdef0123", &profile("./a")).unwrap();
        assert_eq!(store.load(&reference).unwrap(), profile("./a"));
        assert!(temp_dir
            .path()
            .join(".perfcheck/objects/ab/cdef0123/index.json")
            .exists());
    }

    #[test]
    fn test_list_profiles_keeps_one_per_configuration() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsProfileStore::open(temp_dir.path());

        store.register("abcdef0123", &profile("./a")).unwrap();
        let second = store.register("abcdef0123", &profile("./a")).unwrap();
        store.register("abcdef0123", &profile("./b")).unwrap();

        let index = store.list_profiles("abcdef0123").unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index[&profile("./a").config_tuple()].file, second.file);
    }

    #[test]
    fn test_list_profiles_of_unknown_commit_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsProfileStore::open(temp_dir.path());
        assert!(store.list_profiles("ffff").unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_or_corrupt_profile_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsProfileStore::open(temp_dir.path());
        let reference = store.register("abcdef0123", &profile("./a")).unwrap();

        let path = store.object_dir("abcdef0123").join(&reference.file);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            store.load(&reference),
            Err(StoreError::NotFound { .. })
        ));

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            store.load(&reference),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_corrupt_index_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsProfileStore::open(temp_dir.path());
        store.register("abcdef0123", &profile("./a")).unwrap();
        std::fs::write(
            store.object_dir("abcdef0123").join(INDEX_FILE),
            "garbage",
        )
        .unwrap();

        assert!(matches!(
            store.list_profiles("abcdef0123"),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_save_changes_merges_with_stored_list() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsProfileStore::open(temp_dir.path());

        store.save_changes("abcdef0123", &[change("g")]).unwrap();
        let mut updated = change("g");
        updated.change.result = PerformanceChange::MaybeDegradation;
        store
            .save_changes("abcdef0123", &[change("f"), updated])
            .unwrap();

        let loaded = store.load_changes("abcdef0123").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].change.location, "f");
        assert_eq!(loaded[1].change.result, PerformanceChange::MaybeDegradation);
    }

    #[test]
    fn test_save_changes_leaves_no_temporary_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsProfileStore::open(temp_dir.path());
        store.save_changes("abcdef0123", &[change("f")]).unwrap();

        let dir = temp_dir.path().join(".perfcheck/objects/ab");
        let names: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["cdef0123.changes"]);
    }

    #[test]
    fn test_load_changes_without_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsProfileStore::open(temp_dir.path());
        assert!(store.load_changes("abcdef0123").unwrap().is_empty());
    }

    // Filesystem whose renames always fail
    struct FailingRename {
        removed: parking_lot::Mutex<Vec<PathBuf>>,
    }

    impl FileSystem for FailingRename {
        fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }

        fn read_to_string(&self, _path: &Path) -> io::Result<String> {
            Err(io::Error::new(io::ErrorKind::NotFound, "file not found"))
        }

        fn write(&self, _path: &Path, _contents: impl AsRef<[u8]>) -> io::Result<()> {
            Ok(())
        }

        fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
            Err(io::Error::other("cross-device link"))
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            self.removed.lock().push(path.to_path_buf());
            Ok(())
        }

        fn exists(&self, _path: &Path) -> bool {
            false
        }
    }

    #[test]
    fn test_failed_rename_cleans_up_and_reports_io_error() {
        let fs = FailingRename {
            removed: parking_lot::Mutex::new(vec![]),
        };
        let store = FsProfileStore::with_fs(Path::new("/repo"), fs);

        let err = store.save_changes("abcdef0123", &[change("f")]).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));

        let removed = store.fs.removed.lock();
        assert_eq!(removed.len(), 1);
        assert!(removed[0].to_string_lossy().ends_with(".tmp"));
    }

    #[test]
    fn test_short_checksums_get_their_own_directory() {
        let store = FsProfileStore::open(Path::new("/repo"));
        assert_eq!(
            store.object_dir("ab"),
            Path::new("/repo/.perfcheck/objects/short/ab")
        );
        assert_eq!(
            store.changes_path("abc"),
            Path::new("/repo/.perfcheck/objects/ab/c.changes")
        );
    }

    #[test]
    fn test_short_and_underscore_checksums_do_not_collide() {
        let store = FsProfileStore::open(Path::new("/repo"));

        assert_ne!(store.object_dir("ab"), store.object_dir("ab_"));
        assert_ne!(store.changes_path("ab"), store.changes_path("ab_"));
        assert_ne!(store.object_dir("sh"), store.object_dir("short"));
    }

    #[test]
    fn test_dotted_checksums_keep_their_changes_apart() {
        let store = FsProfileStore::open(Path::new("/repo"));

        assert_eq!(
            store.changes_path("v1.2"),
            Path::new("/repo/.perfcheck/objects/v1/.2.changes")
        );
        assert_ne!(store.changes_path("v1.2"), store.changes_path("v1.3"));
        assert_eq!(
            store.changes_path("x"),
            Path::new("/repo/.perfcheck/objects/short/x.changes")
        );
    }

    #[test]
    fn test_changes_of_short_checksums_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsProfileStore::open(temp_dir.path());

        store.save_changes("ab", &[change("f")]).unwrap();
        store.save_changes("ab_", &[change("g")]).unwrap();

        assert_eq!(store.load_changes("ab").unwrap()[0].change.location, "f");
        assert_eq!(store.load_changes("ab_").unwrap()[0].change.location, "g");
    }
}
