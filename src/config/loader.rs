//! Configuration file loading

use super::{ConfigError, ConfigStack};
use crate::infra::{FileSystem, RealFileSystem};
use std::path::{Path, PathBuf};

/// Location of the per-repository configuration, relative to the project root
pub const LOCAL_CONFIG_PATH: &str = ".perfcheck/config.toml";

/// Environment variable overriding the shared configuration path
pub const SHARED_CONFIG_ENV: &str = "PERFCHECK_SHARED_CONFIG";

/// Builds a [`ConfigStack`] from the local and shared configuration files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the local and shared configuration of a project
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use perfcheck::config::ConfigLoader;
    /// use std::path::Path;
    ///
    /// let config = ConfigLoader::load(Path::new("."))?;
    /// let apply = config.lookup_or("degradation.apply", "first".to_string())?;
    /// println!("apply policy: {}", apply);
    /// # Ok::<(), perfcheck::config::ConfigError>(())
    /// ```
    pub fn load(project_root: &Path) -> Result<ConfigStack, ConfigError> {
        Self::load_with_fs(
            project_root,
            Self::shared_config_path().as_deref(),
            &RealFileSystem,
        )
    }

    /// Load configuration with a custom filesystem implementation
    ///
    /// Missing files leave their scope out of the stack.
    pub fn load_with_fs<FS: FileSystem>(
        project_root: &Path,
        shared_path: Option<&Path>,
        fs: &FS,
    ) -> Result<ConfigStack, ConfigError> {
        let mut stack = ConfigStack::new();

        let local_path = project_root.join(LOCAL_CONFIG_PATH);
        let scopes = std::iter::once(("local", local_path.as_path()))
            .chain(shared_path.map(|path| ("shared", path)));

        for (name, path) in scopes {
            let contents = match fs.read_to_string(path) {
                Ok(c) => c,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    log::debug!("No {} configuration at {}", name, path.display());
                    continue;
                }
                Err(source) => {
                    return Err(ConfigError::Io {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            };

            let doc = contents.parse().map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
            log::debug!("Loaded {} configuration from {}", name, path.display());
            stack.push_scope(name, doc);
        }

        Ok(stack)
    }

    /// Shared configuration path: `$PERFCHECK_SHARED_CONFIG`, else `~/.config/perfcheck/config.toml`
    pub fn shared_config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(SHARED_CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("perfcheck")
                .join("config.toml")
        })
    }

    /// Write a starter local configuration unless one exists
    pub fn init_local_with_fs<FS: FileSystem>(project_root: &Path, fs: &FS) -> std::io::Result<bool> {
        let path = project_root.join(LOCAL_CONFIG_PATH);
        if fs.exists(&path) {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs.create_dir_all(parent)?;
        }
        fs.write(&path, DEFAULT_LOCAL_CONFIG)?;
        Ok(true)
    }
}

const DEFAULT_LOCAL_CONFIG: &str = r#"[degradation]
apply = "first"
collect_before_check = false
log_collect = false

[[degradation.strategies]]
method = "lreg"
postprocessor = "regression_analysis"

[[degradation.strategies]]
method = "aat"
"#;
