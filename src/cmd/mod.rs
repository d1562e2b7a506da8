//! Command handlers for the perfcheck CLI
//!
//! Each submodule handles one CLI command. Handlers print to stdout and
//! return `anyhow::Result` so `main` can render errors uniformly.

pub mod changes;
pub mod check;
pub mod completions;
pub mod init;
pub mod register;

pub use changes::cmd_changes;
pub use check::{cmd_check_all, cmd_check_head, cmd_check_profiles};
pub use completions::cmd_completions;
pub use init::cmd_init;
pub use register::cmd_register;

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::{ConfigLoader, ConfigStack};
use crate::engine::DEFAULT_VCS_TYPE;
use crate::error::CheckError;
use crate::vcs::{self, MinorVersion, VersionControl};

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Project root, the current directory when unset
    pub root: Option<PathBuf>,
    /// Collect missing profiles before checking
    pub compute_missing: bool,
    /// Print only summaries
    pub quiet: bool,
}

impl GlobalOptions {
    /// Resolved project root
    pub fn project_root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

/// Load the configuration stack of a project and apply CLI overrides
pub(crate) fn load_config(root: &Path, options: &GlobalOptions) -> Result<ConfigStack> {
    let mut config = ConfigLoader::load(root).map_err(CheckError::from)?;
    if options.compute_missing {
        config
            .set_runtime("degradation.collect_before_check", true)
            .map_err(CheckError::from)?;
    }
    Ok(config)
}

/// Resolve `rev` with the configured version control backend
pub(crate) fn resolve_minor(root: &Path, config: &ConfigStack, rev: &str) -> Result<MinorVersion> {
    let kind: String = config
        .lookup_or("vcs.type", DEFAULT_VCS_TYPE.to_string())
        .map_err(CheckError::from)?;
    let minor = vcs::open(&kind, root)
        .and_then(|repo| repo.get_minor_version_info(rev))
        .map_err(CheckError::from)?;
    Ok(minor)
}
