//! Degradation detection between pairs of profiles
//!
//! This module provides:
//! - [`DetectionStrategy`]: pluggable classifiers comparing a baseline and a target profile
//! - [`StrategyRegistry`]: name to strategy resolution with typed errors
//! - [`select_strategies`]: rule based choice of strategies for a profile
//! - [`DegradationChecker`]: runs the selected strategies over a pair of profiles

pub mod average_amount;
pub mod change;
pub mod checker;
pub mod fit;
pub mod linear_regression;
pub mod registry;
pub mod selector;

pub use average_amount::AverageAmountThreshold;
pub use change::{ChangeRecord, Confidence, DetectedChange, PerformanceChange, Thresholds};
pub use checker::DegradationChecker;
pub use linear_regression::LinearRegression;
pub use registry::StrategyRegistry;
pub use selector::{parse_strategy, select_strategies, ApplyPolicy, DetectionRule, SelectStrategies};

use crate::profile::Profile;

/// Lazily produced change records
pub type ChangeIter<'p> = Box<dyn Iterator<Item = ChangeRecord> + 'p>;

/// A classifier comparing a baseline profile with a target profile of the same configuration
///
/// Implementations yield one record per resource location they can judge.
/// The returned iterator only borrows the profiles, so it can outlive the
/// strategy handle it came from.
pub trait DetectionStrategy: Send + Sync {
    /// Canonical strategy name used in rules
    fn name(&self) -> &str;

    /// Compare the two profiles
    fn detect<'p>(&self, baseline: &'p Profile, target: &'p Profile) -> ChangeIter<'p>;
}

/// Signed relative change from `baseline` to `target` in percent
///
/// A zero baseline yields 0 when the target is zero too and a signed infinity otherwise.
///
/// # Examples
///
/// ```
/// use perfcheck::check::relative_change;
///
/// assert_eq!(relative_change(10.0, 15.0), 50.0);
/// assert_eq!(relative_change(0.0, 0.0), 0.0);
/// assert_eq!(relative_change(0.0, 3.0), f64::INFINITY);
/// ```
pub fn relative_change(baseline: f64, target: f64) -> f64 {
    if baseline == 0.0 {
        if target == 0.0 {
            0.0
        } else if target > 0.0 {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        }
    } else {
        100.0 * (target - baseline) / baseline
    }
}
