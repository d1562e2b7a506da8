//! Registry of detection strategies

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::average_amount::{self, AverageAmountThreshold};
use super::linear_regression::{self, LinearRegression};
use super::{DetectionStrategy, Thresholds};
use crate::config::ConfigStack;
use crate::error::CheckError;

/// Registry resolving strategy names to strategies
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: RwLock<BTreeMap<String, Arc<dyn DetectionStrategy>>>,
}

impl StrategyRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in strategies at their default thresholds
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(LinearRegression::default()));
        registry.register(Arc::new(AverageAmountThreshold::default()));
        registry
    }

    /// Registry with the built-in strategies, thresholds taken from configuration
    ///
    /// Reads `degradation.<strategy>.maybe_threshold` and `degradation.<strategy>.threshold`.
    pub fn from_config(config: &ConfigStack) -> Result<Self, CheckError> {
        let registry = Self::new();
        registry.register(Arc::new(LinearRegression::new(thresholds_from(
            config,
            "degradation.linear_regression",
            linear_regression::DEFAULT_MAYBE_THRESHOLD,
            linear_regression::DEFAULT_THRESHOLD,
        )?)));
        registry.register(Arc::new(AverageAmountThreshold::new(thresholds_from(
            config,
            "degradation.average_amount",
            average_amount::DEFAULT_MAYBE_THRESHOLD,
            average_amount::DEFAULT_THRESHOLD,
        )?)));
        Ok(registry)
    }

    /// Register a strategy under its name, replacing any previous one
    pub fn register(&self, strategy: Arc<dyn DetectionStrategy>) {
        let name = strategy.name().to_string();
        if self.strategies.write().insert(name.clone(), strategy).is_some() {
            log::debug!("Replaced detection strategy '{}'", name);
        }
    }

    /// Look up a strategy by canonical name
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn DetectionStrategy>, CheckError> {
        let strategies = self.strategies.read();
        strategies
            .get(name)
            .cloned()
            .ok_or_else(|| CheckError::UnknownStrategy {
                name: name.to_string(),
                available: strategies.keys().cloned().collect(),
            })
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.strategies.read().keys().cloned().collect()
    }
}

fn thresholds_from(
    config: &ConfigStack,
    section: &str,
    default_maybe: f64,
    default_confirmed: f64,
) -> Result<Thresholds, CheckError> {
    let maybe = config.lookup_or(&format!("{}.maybe_threshold", section), default_maybe)?;
    let confirmed = config.lookup_or(&format!("{}.threshold", section), default_confirmed)?;
    Thresholds::new(maybe, confirmed).map_err(|_| CheckError::Configuration {
        message: format!(
            "'{}.threshold' ({}) must be greater than '{}.maybe_threshold' ({}) and both non-negative",
            section, confirmed, section, maybe
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{ChangeIter, PerformanceChange};
    use crate::profile::Profile;

    struct Silent;

    impl DetectionStrategy for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        fn detect<'p>(&self, _baseline: &'p Profile, _target: &'p Profile) -> ChangeIter<'p> {
            Box::new(std::iter::empty())
        }
    }

    #[test]
    fn test_defaults_register_builtin_strategies() {
        let registry = StrategyRegistry::with_defaults();
        assert_eq!(
            registry.names(),
            vec!["average_amount_threshold", "linear_regression"]
        );
    }

    #[test]
    fn test_resolve_unknown_lists_available() {
        let registry = StrategyRegistry::with_defaults();
        match registry.resolve("best_model_order_equality") {
            Err(CheckError::UnknownStrategy { name, available }) => {
                assert_eq!(name, "best_model_order_equality");
                assert_eq!(available.len(), 2);
            }
            other => panic!("expected UnknownStrategy, got {:?}", other.map(|s| s.name().to_string())),
        }
    }

    #[test]
    fn test_register_custom_strategy() {
        let registry = StrategyRegistry::new();
        registry.register(Arc::new(Silent));
        assert_eq!(registry.resolve("silent").unwrap().name(), "silent");
    }

    #[test]
    fn test_thresholds_from_config() {
        let mut config = ConfigStack::new();
        config
            .push_toml(
                "local",
                "[degradation.linear_regression]\nmaybe_threshold = 1\nthreshold = 2.5",
            )
            .unwrap();

        let registry = StrategyRegistry::from_config(&config).unwrap();
        let lreg = registry.resolve("linear_regression").unwrap();
        assert_eq!(lreg.name(), "linear_regression");

        // 3% is a confirmed change with these thresholds
        let mut base = crate::profile::Profile::from_json(
            r#"{"collector_info": {"name": "time"}, "resources": [{"amount": 100, "uid": "f"}]}"#,
        )
        .unwrap();
        let mut target = base.clone();
        target.resources[0].amount = 103.0;
        let record = lreg.detect(&base, &target).next().unwrap();
        assert_eq!(record.result, PerformanceChange::Degradation);
        base.resources.clear();
        assert_eq!(lreg.detect(&base, &target).count(), 0);
    }

    #[test]
    fn test_inverted_thresholds_are_configuration_error() {
        let mut config = ConfigStack::new();
        config
            .push_toml(
                "local",
                "[degradation.average_amount]\nmaybe_threshold = 50\nthreshold = 10",
            )
            .unwrap();

        let err = StrategyRegistry::from_config(&config).err().unwrap();
        assert!(matches!(err, CheckError::Configuration { ref message } if message.contains("average_amount")));
    }
}
