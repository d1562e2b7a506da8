//! Init command implementation
//!
//! Handles the `perfcheck init` command which writes a starter
//! `.perfcheck/config.toml` for the project.

use anyhow::Result;
use console::{style, Emoji};

use super::GlobalOptions;
use crate::config::{ConfigLoader, LOCAL_CONFIG_PATH};
use crate::infra::RealFileSystem;

static CHECKMARK: Emoji = Emoji("✅", "[OK]");
static INFO: Emoji = Emoji("ℹ️", "i");

/// Write the starter configuration unless one already exists
///
/// # Examples
///
/// ```no_run
/// use perfcheck::cmd::{cmd_init, GlobalOptions};
///
/// cmd_init(&GlobalOptions::default())?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn cmd_init(options: &GlobalOptions) -> Result<()> {
    let root = options.project_root()?;

    if ConfigLoader::init_local_with_fs(&root, &RealFileSystem)? {
        println!(
            "{} Created {}",
            CHECKMARK,
            style(LOCAL_CONFIG_PATH).cyan()
        );
        println!("   Edit [[degradation.strategies]] to choose detection methods.");
    } else {
        println!(
            "{} Config file already exists: {}",
            INFO,
            style(LOCAL_CONFIG_PATH).cyan()
        );
    }
    Ok(())
}
