//! Check command implementation
//!
//! Handles `perfcheck check head`, `perfcheck check all` and
//! `perfcheck check profiles`.

use anyhow::{Context, Result};
use console::{style, Emoji};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use super::{load_config, GlobalOptions};
use crate::check::DetectedChange;
use crate::engine::HistoryEngine;
use crate::error::CheckError;
use crate::profile::Profile;
use crate::report;
use crate::store::FsProfileStore;
use crate::vcs::VersionControl;

static MICROSCOPE: Emoji = Emoji("🔍", ">>");
static CHART: Emoji = Emoji("📊", "~");

type Engine = HistoryEngine<Box<dyn VersionControl>, FsProfileStore>;

fn open_engine(options: &GlobalOptions) -> Result<Engine> {
    let root = options.project_root()?;
    let config = load_config(&root, options)?;
    Ok(HistoryEngine::open(&root, &config)?)
}

fn print_result(changes: &[DetectedChange], options: &GlobalOptions) {
    if !options.quiet && !changes.is_empty() {
        println!();
        print!("{}", report::format_changes(changes));
    }
    println!("{} {}", CHART, report::summary(changes));
}

/// Check one minor version against its nearest ancestors
///
/// # Examples
///
/// ```no_run
/// use perfcheck::cmd::{cmd_check_head, GlobalOptions};
///
/// cmd_check_head("HEAD", &GlobalOptions::default())?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn cmd_check_head(rev: &str, options: &GlobalOptions) -> Result<()> {
    let engine = open_engine(options)?;
    let minor = engine
        .vcs()
        .get_minor_version_info(rev)
        .map_err(CheckError::from)?;

    println!("{} {}", MICROSCOPE, report::minor_version_line(&minor));
    let changes = engine.check_commit(&minor.checksum)?;
    print_result(&changes, options);
    Ok(())
}

/// Check every minor version reachable from `rev`
pub fn cmd_check_all(rev: &str, options: &GlobalOptions) -> Result<()> {
    let engine = open_engine(options)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Walking history from {}", rev));

    let mut all_changes = Vec::new();
    for commit in engine.history(rev) {
        let commit = commit?;
        let counts = report::count_changes_per_group(&commit.changes);
        spinner.suspend(|| {
            println!(
                "{} | {}",
                report::minor_version_line(&commit.minor),
                report::short_change_string(&counts)
            )
        });
        spinner.set_message(format!("Checked {}", commit.minor.short_checksum()));
        all_changes.extend(commit.changes);
    }
    spinner.finish_and_clear();

    print_result(&all_changes, options);
    Ok(())
}

/// Compare two profile files directly
///
/// The changes are stored for the target's origin, else for `minor`
/// (default `HEAD`).
pub fn cmd_check_profiles(
    baseline: &Path,
    target: &Path,
    minor: Option<&str>,
    options: &GlobalOptions,
) -> Result<()> {
    let baseline_profile = read_profile(baseline)?;
    let target_profile = read_profile(target)?;
    let engine = open_engine(options)?;

    let minor = match (&target_profile.origin, minor) {
        (Some(origin), None) => origin.clone(),
        (_, reference) => {
            engine
                .vcs()
                .get_minor_version_info(reference.unwrap_or("HEAD"))
                .map_err(CheckError::from)?
                .checksum
        }
    };

    println!(
        "{} Comparing {} with {}",
        MICROSCOPE,
        style(baseline.display()).cyan(),
        style(target.display()).cyan()
    );
    let changes = engine.compare_profiles(&baseline_profile, &target_profile, &minor)?;
    print_result(&changes, options);
    Ok(())
}

/// Read and parse a profile document
pub(crate) fn read_profile(path: &Path) -> Result<Profile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile {}", path.display()))?;
    Profile::from_json(&contents).with_context(|| format!("Invalid profile {}", path.display()))
}
