//! History degradation engine
//!
//! For a target minor version the engine walks its ancestors breadth-first
//! and pairs every stored target profile with the nearest ancestor profile of
//! the same configuration. Each target configuration is matched at most once;
//! the walk stops as soon as all of them are matched or the history runs out.

use std::collections::{HashSet, VecDeque};
use std::path::Path;

use crate::check::{DegradationChecker, DetectedChange};
use crate::collect::Precollector;
use crate::config::ConfigStack;
use crate::error::CheckError;
use crate::profile::{ConfigTuple, Profile};
use crate::store::{FsProfileStore, ProfileIndex, ProfileRef, ProfileStore};
use crate::vcs::{self, MinorVersion, MinorVersionWalk, VersionControl};

/// Backend used when `vcs.type` is not configured
pub const DEFAULT_VCS_TYPE: &str = "git";

/// Changes found for one minor version of a history walk
#[derive(Debug, Clone, PartialEq)]
pub struct CommitChanges {
    /// The checked minor version
    pub minor: MinorVersion,
    /// Changes against its ancestors, without `NoChange` records
    pub changes: Vec<DetectedChange>,
}

/// Checks minor versions against their history
pub struct HistoryEngine<V: VersionControl, S: ProfileStore> {
    vcs: V,
    store: S,
    checker: DegradationChecker,
    precollector: Option<Precollector>,
}

impl HistoryEngine<Box<dyn VersionControl>, FsProfileStore> {
    /// Engine for the project at `root`, set up from configuration
    ///
    /// Reads `vcs.type`, the `degradation` section and the pre-collection keys.
    pub fn open(root: &Path, config: &ConfigStack) -> Result<Self, CheckError> {
        let kind: String = config.lookup_or("vcs.type", DEFAULT_VCS_TYPE.to_string())?;
        let vcs = vcs::open(&kind, root)?;
        let store = FsProfileStore::open(root);
        let checker = DegradationChecker::from_config(config)?;
        let precollector = Precollector::from_config(config, &store.log_directory())?;

        let engine = Self::new(vcs, store, checker);
        Ok(match precollector {
            Some(precollector) => engine.with_precollector(precollector),
            None => engine,
        })
    }
}

impl<V: VersionControl, S: ProfileStore> HistoryEngine<V, S> {
    /// Create an engine without pre-collection
    pub fn new(vcs: V, store: S, checker: DegradationChecker) -> Self {
        Self {
            vcs,
            store,
            checker,
            precollector: None,
        }
    }

    /// Collect every minor version before its profiles are indexed
    pub fn with_precollector(mut self, precollector: Precollector) -> Self {
        self.precollector = Some(precollector);
        self
    }

    /// Version control backend
    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Profile store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Pairwise checker
    pub fn checker(&self) -> &DegradationChecker {
        &self.checker
    }

    /// Forget which minor versions were already pre-collected
    pub fn reset_precollect_cache(&self) {
        if let Some(precollector) = &self.precollector {
            precollector.reset();
        }
    }

    /// Check one minor version against its nearest ancestors
    ///
    /// The accumulated list is saved for the minor version after every
    /// ancestor. Errors local to one configuration are logged and skipped.
    pub fn check_commit(&self, reference: &str) -> Result<Vec<DetectedChange>, CheckError> {
        let target = self.vcs.get_minor_version_info(reference)?;
        self.check_minor(&target)
    }

    /// Check every minor version reachable from `head`, in breadth-first order
    pub fn check_history(&self, head: &str) -> Result<Vec<DetectedChange>, CheckError> {
        let mut changes = Vec::new();
        for commit in self.history(head) {
            changes.extend(commit?.changes);
        }
        Ok(changes)
    }

    /// Lazily check the history from `head`, one minor version at a time
    pub fn history(&self, head: &str) -> History<'_, V, S> {
        History {
            engine: self,
            walk: self.vcs.walk(head),
        }
    }

    /// Compare two profile documents directly
    ///
    /// See [`DegradationChecker::compare_files`].
    pub fn compare_profiles(
        &self,
        baseline: &Profile,
        target: &Profile,
        minor: &str,
    ) -> Result<Vec<DetectedChange>, CheckError> {
        self.checker.compare_files(&self.store, baseline, target, minor)
    }

    fn check_minor(&self, target: &MinorVersion) -> Result<Vec<DetectedChange>, CheckError> {
        let mut pending = self.index_for(target)?;
        log::info!(
            "Checking {} ({} configuration(s))",
            target.short_checksum(),
            pending.len()
        );

        let mut detected = Vec::new();
        let mut seen: HashSet<String> = HashSet::from([target.checksum.clone()]);
        let mut frontier: VecDeque<String> = VecDeque::new();
        for parent in &target.parents {
            if seen.insert(parent.clone()) {
                frontier.push_back(parent.clone());
            }
        }

        while !pending.is_empty() {
            let Some(reference) = frontier.pop_front() else {
                break;
            };
            let baseline = self.vcs.get_minor_version_info(&reference)?;
            for parent in &baseline.parents {
                if seen.insert(parent.clone()) {
                    frontier.push_back(parent.clone());
                }
            }

            for (config, baseline_ref) in self.index_for(&baseline)? {
                let Some(target_ref) = pending.remove(&config) else {
                    continue;
                };
                log::debug!("Comparing {} against {}", target_ref, baseline_ref);
                match self.compare_stored(&config, &baseline_ref, &target_ref) {
                    Ok(changes) => detected.extend(changes),
                    Err(e) if e.is_recoverable() => {
                        log::warn!("Skipping {} for {}: {}", config, target.short_checksum(), e)
                    }
                    Err(e) => return Err(e),
                }
            }

            self.store.save_changes(&target.checksum, &detected)?;
        }

        if !pending.is_empty() {
            log::debug!(
                "{} configuration(s) of {} have no baseline",
                pending.len(),
                target.short_checksum()
            );
        }
        Ok(detected)
    }

    fn compare_stored(
        &self,
        config: &ConfigTuple,
        baseline_ref: &ProfileRef,
        target_ref: &ProfileRef,
    ) -> Result<Vec<DetectedChange>, CheckError> {
        let baseline = self.store.load(baseline_ref)?;
        let target = self.store.load(target_ref)?;
        let command = config.to_cmdstr();

        let changes = self
            .checker
            .compare(&baseline, &target)?
            .filter(|record| record.result.is_change())
            .map(|change| DetectedChange {
                change,
                command: command.clone(),
                baseline_commit: baseline_ref.checksum.clone(),
            })
            .collect();
        Ok(changes)
    }

    fn index_for(&self, minor: &MinorVersion) -> Result<ProfileIndex, CheckError> {
        if let Some(precollector) = &self.precollector {
            precollector.ensure_collected(minor);
        }
        Ok(self.store.list_profiles(&minor.checksum)?)
    }
}

/// Iterator returned by [`HistoryEngine::history`]
pub struct History<'e, V: VersionControl, S: ProfileStore> {
    engine: &'e HistoryEngine<V, S>,
    walk: MinorVersionWalk<'e, V>,
}

impl<V: VersionControl, S: ProfileStore> Iterator for History<'_, V, S> {
    type Item = Result<CommitChanges, CheckError>;

    fn next(&mut self) -> Option<Self::Item> {
        let minor = match self.walk.next()? {
            Ok(minor) => minor,
            Err(e) => return Some(Err(e.into())),
        };
        Some(
            self.engine
                .check_minor(&minor)
                .map(|changes| CommitChanges { minor, changes }),
        )
    }
}
