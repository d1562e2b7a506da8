//! Pairwise degradation checking

use std::sync::Arc;

use super::selector::{select_strategies, ApplyPolicy, DetectionRule, SelectStrategies};
use super::{ChangeIter, DetectedChange, StrategyRegistry};
use crate::config::{ConfigError, ConfigStack};
use crate::error::CheckError;
use crate::profile::Profile;
use crate::store::ProfileStore;

/// Runs the strategies selected by the detection rules over pairs of profiles
pub struct DegradationChecker {
    registry: Arc<StrategyRegistry>,
    rules: Vec<DetectionRule>,
    policy: ApplyPolicy,
}

impl DegradationChecker {
    /// Create a checker from explicit parts
    pub fn new(registry: Arc<StrategyRegistry>, rules: Vec<DetectionRule>, policy: ApplyPolicy) -> Self {
        Self {
            registry,
            rules,
            policy,
        }
    }

    /// Build the checker from `degradation.apply`, `degradation.strategies` and
    /// the strategy thresholds
    ///
    /// A missing `degradation.apply` is a configuration error, never defaulted.
    pub fn from_config(config: &ConfigStack) -> Result<Self, CheckError> {
        let policy = match config.lookup_as::<String>("degradation.apply") {
            Ok(value) => value.parse()?,
            Err(ConfigError::MissingKey { .. }) => {
                return Err(CheckError::Configuration {
                    message: "'degradation.apply' could not be found in any configuration".to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let rules = config
            .gather("degradation.strategies")
            .iter()
            .map(DetectionRule::from_item)
            .collect::<Result<Vec<_>, _>>()?;
        if rules.is_empty() {
            log::warn!("No rules under 'degradation.strategies', nothing will be detected");
        }

        let registry = Arc::new(StrategyRegistry::from_config(config)?);
        Ok(Self::new(registry, rules, policy))
    }

    /// Strategy registry in use
    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    /// Apply policy in use
    pub fn policy(&self) -> ApplyPolicy {
        self.policy
    }

    /// Strategies selected for a profile, in rule order
    pub fn strategies_for<'a>(&'a self, profile: &'a Profile) -> SelectStrategies<'a> {
        select_strategies(profile, &self.rules, self.policy)
    }

    /// Compare a baseline with a target profile
    ///
    /// Strategies are chosen by the baseline's configuration and resolved
    /// before any record is produced, so an unknown strategy fails the whole
    /// comparison. Records are yielded lazily, strategy by strategy.
    pub fn compare<'p>(&self, baseline: &'p Profile, target: &'p Profile) -> Result<ChangeIter<'p>, CheckError> {
        let strategies = self
            .strategies_for(baseline)
            .map(|name| self.registry.resolve(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Box::new(
            strategies
                .into_iter()
                .flat_map(move |strategy| strategy.detect(baseline, target)),
        ))
    }

    /// Compare two profile documents directly and persist the changes
    ///
    /// The changes are saved for the target's `origin` when it has one, else
    /// for `minor`. Records without change are dropped.
    pub fn compare_files<S: ProfileStore>(
        &self,
        store: &S,
        baseline: &Profile,
        target: &Profile,
        minor: &str,
    ) -> Result<Vec<DetectedChange>, CheckError> {
        let baseline_config = baseline.config_tuple();
        let target_config = target.config_tuple();
        if baseline_config != target_config {
            return Err(CheckError::IncompatibleConfiguration {
                baseline: Box::new(baseline_config),
                target: Box::new(target_config),
            });
        }

        let target_minor = target.origin.as_deref().unwrap_or(minor);
        let command = baseline_config.to_cmdstr();
        let changes: Vec<DetectedChange> = self
            .compare(baseline, target)?
            .filter(|record| record.result.is_change())
            .map(|change| DetectedChange {
                change,
                command: command.clone(),
                baseline_commit: target_minor.to_string(),
            })
            .collect();

        store.save_changes(target_minor, &changes)?;
        Ok(changes)
    }
}
