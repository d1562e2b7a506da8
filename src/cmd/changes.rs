//! Changes command implementation
//!
//! Prints the change list stored for a minor version by earlier checks.

use anyhow::Result;

use super::GlobalOptions;
use crate::error::CheckError;
use crate::report;
use crate::store::{FsProfileStore, ProfileStore};

/// Print the stored changes of `rev`
pub fn cmd_changes(rev: &str, options: &GlobalOptions) -> Result<()> {
    let root = options.project_root()?;
    let config = super::load_config(&root, options)?;
    let minor = super::resolve_minor(&root, &config, rev)?;

    let changes = FsProfileStore::open(&root)
        .load_changes(&minor.checksum)
        .map_err(CheckError::from)?;

    println!("{}", report::minor_version_line(&minor));
    if !options.quiet {
        print!("{}", report::format_changes(&changes));
    }
    println!("{}", report::summary(&changes));
    Ok(())
}
