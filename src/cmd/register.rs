//! Register command implementation

use anyhow::Result;
use console::{style, Emoji};
use std::path::Path;

use super::check::read_profile;
use super::GlobalOptions;
use crate::error::CheckError;
use crate::store::FsProfileStore;

static CHECKMARK: Emoji = Emoji("✅", "[OK]");

/// Store a profile file for the minor version `rev`
///
/// A profile with the same configuration replaces the previous one.
pub fn cmd_register(rev: &str, profile_path: &Path, options: &GlobalOptions) -> Result<()> {
    let root = options.project_root()?;
    let config = super::load_config(&root, options)?;
    let minor = super::resolve_minor(&root, &config, rev)?;

    let profile = read_profile(profile_path)?;
    let store = FsProfileStore::open(&root);
    let reference = store.register(&minor.checksum, &profile).map_err(CheckError::from)?;

    println!(
        "{} Registered {} as {}",
        CHECKMARK,
        style(profile_path.display()).cyan(),
        style(&reference).bold()
    );
    if !options.quiet {
        println!("   {}", reference.config);
    }
    Ok(())
}
