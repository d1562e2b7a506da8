//! Linear regression classifier
//!
//! Fits the lowest-order model (constant or linear) to the samples of every
//! location found in both profiles and compares the model values over the
//! union of sampled points. A model that gains a growing linear term is a
//! degradation no matter the rate, and losing one is an optimization.
//! Everything else, falling trends included, is classified by thresholds.

use std::collections::BTreeMap;

use super::change::{ChangeRecord, Confidence, PerformanceChange, Thresholds};
use super::fit::{fit_best, Fit};
use super::{relative_change, ChangeIter, DetectionStrategy};
use crate::profile::Profile;

/// Default threshold for a possible change, in percent
pub const DEFAULT_MAYBE_THRESHOLD: f64 = 5.0;
/// Default threshold for a confirmed change, in percent
pub const DEFAULT_THRESHOLD: f64 = 25.0;

/// Linear regression based detection strategy
#[derive(Debug, Clone, Copy)]
pub struct LinearRegression {
    thresholds: Thresholds,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::from_ordered(DEFAULT_MAYBE_THRESHOLD, DEFAULT_THRESHOLD),
        }
    }
}

impl LinearRegression {
    /// Strategy with custom thresholds
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Active thresholds
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }
}

impl DetectionStrategy for LinearRegression {
    fn name(&self) -> &str {
        "linear_regression"
    }

    fn detect<'p>(&self, baseline: &'p Profile, target: &'p Profile) -> ChangeIter<'p> {
        let thresholds = self.thresholds;
        let baseline_samples = samples_by_location(baseline);
        let target_samples = samples_by_location(target);

        Box::new(
            baseline_samples
                .into_iter()
                .filter_map(move |(location, base)| {
                    let targ = target_samples.get(location)?;
                    compare_location(location, &base, targ, thresholds)
                }),
        )
    }
}

/// `(x, y)` samples per location, x being the structure size or the order of appearance
fn samples_by_location(profile: &Profile) -> BTreeMap<&str, Vec<(f64, f64)>> {
    let mut samples: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
    for resource in &profile.resources {
        let points = samples.entry(resource.uid.as_str()).or_default();
        let x = resource
            .structure_unit_size
            .unwrap_or(points.len() as f64);
        points.push((x, resource.amount));
    }
    samples
}

fn compare_location(
    location: &str,
    baseline: &[(f64, f64)],
    target: &[(f64, f64)],
    thresholds: Thresholds,
) -> Option<ChangeRecord> {
    let base_fit = fit_best(baseline)?;
    let target_fit = fit_best(target)?;

    let mut points: Vec<f64> = baseline.iter().chain(target).map(|(x, _)| *x).collect();
    points.sort_by(f64::total_cmp);
    points.dedup();

    let base_value: f64 = points.iter().map(|x| base_fit.predict(*x)).sum();
    let target_value: f64 = points.iter().map(|x| target_fit.predict(*x)).sum();
    let rate = relative_change(base_value, target_value);

    let kind = base_fit.kind.max(target_fit.kind);
    let result = if target_fit.kind > base_fit.kind && target_fit.slope > 0.0 {
        PerformanceChange::Degradation
    } else if target_fit.kind < base_fit.kind && base_fit.slope > 0.0 {
        PerformanceChange::Optimization
    } else if base_value == 0.0 && target_value != 0.0 {
        PerformanceChange::Unknown
    } else {
        thresholds.classify(rate)
    };

    Some(ChangeRecord {
        result,
        kind: kind.label().to_string(),
        location: location.to_string(),
        from_baseline: describe(&base_fit, base_value),
        to_target: describe(&target_fit, target_value),
        confidence: confidence(&base_fit, &target_fit),
        rate_degradation: rate,
    })
}

fn describe(fit: &Fit, value: f64) -> String {
    format!("{}({:.2})", fit.kind.label(), value)
}

fn confidence(base: &Fit, target: &Fit) -> Confidence {
    match (base.r_square, target.r_square) {
        (Some(b), Some(t)) => Confidence::RSquare(b.min(t)),
        _ => Confidence::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{CollectorInfo, Resource};
    use std::collections::BTreeMap as Map;

    fn profile(samples: &[(&str, f64, f64)]) -> Profile {
        Profile {
            origin: None,
            header: Map::new(),
            collector_info: CollectorInfo {
                name: "complexity".to_string(),
                params: serde_json::Value::Null,
            },
            postprocessors: vec![],
            resources: samples
                .iter()
                .map(|(uid, size, amount)| Resource {
                    amount: *amount,
                    uid: uid.to_string(),
                    kind: "mixed".to_string(),
                    subtype: None,
                    structure_unit_size: Some(*size),
                    extra: Map::new(),
                })
                .collect(),
        }
    }

    fn constant(uid: &str) -> Vec<(&str, f64, f64)> {
        (1..=10).map(|x| (uid, x as f64, 10.0)).collect()
    }

    fn linear(uid: &str) -> Vec<(&str, f64, f64)> {
        (1..=10).map(|x| (uid, x as f64, 10.0 * x as f64)).collect()
    }

    fn scaled(uid: &str, factor: f64) -> Vec<(&str, f64, f64)> {
        (1..=10).map(|x| (uid, x as f64, factor * 10.0)).collect()
    }

    #[test]
    fn test_constant_to_linear_is_degradation() {
        let base = profile(&constant("f"));
        let target = profile(&linear("f"));
        let records: Vec<_> = LinearRegression::default().detect(&base, &target).collect();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.location, "f");
        assert_eq!(record.result, PerformanceChange::Degradation);
        assert_eq!(record.kind, "linear");
        assert!(record.rate_degradation > 0.0);
        assert_eq!(record.from_baseline, "constant(100.00)");
        assert_eq!(record.to_target, "linear(550.00)");
    }

    #[test]
    fn test_linear_to_constant_is_optimization_with_other_magnitude() {
        let base = profile(&constant("f"));
        let target = profile(&linear("f"));
        let strategy = LinearRegression::default();

        let worse = strategy.detect(&base, &target).next().unwrap();
        let better = strategy.detect(&target, &base).next().unwrap();

        assert_eq!(better.result, PerformanceChange::Optimization);
        assert!(better.rate_degradation < 0.0);
        assert!((better.rate_degradation.abs() - worse.rate_degradation.abs()).abs() > 1.0);
    }

    #[test]
    fn test_falling_linear_target_is_not_degradation() {
        let base = profile(&[("f", 1.0, 100.0), ("f", 2.0, 100.0), ("f", 3.0, 100.0), ("f", 4.0, 100.0)]);
        let target = profile(&[("f", 1.0, 50.0), ("f", 2.0, 40.0), ("f", 3.0, 30.0), ("f", 4.0, 20.0)]);

        let record = LinearRegression::default().detect(&base, &target).next().unwrap();
        assert_eq!(record.result, PerformanceChange::Optimization);
        assert_eq!(record.kind, "linear");
        assert!((record.rate_degradation + 65.0).abs() < 1e-9);
        assert_eq!(record.to_target, "linear(140.00)");
    }

    #[test]
    fn test_dropping_falling_trend_uses_thresholds() {
        let base = profile(&[("f", 1.0, 50.0), ("f", 2.0, 40.0), ("f", 3.0, 30.0), ("f", 4.0, 20.0)]);
        let target = profile(&[("f", 1.0, 30.0), ("f", 2.0, 30.0), ("f", 3.0, 30.0), ("f", 4.0, 30.0)]);

        let record = LinearRegression::default().detect(&base, &target).next().unwrap();
        assert_eq!(record.result, PerformanceChange::MaybeOptimization);
        assert!(record.rate_degradation < 0.0);
    }

    #[test]
    fn test_self_comparison_without_maybe_threshold_is_no_change() {
        let strategy = LinearRegression::new(Thresholds::new(0.0, 10.0).unwrap());
        let mut samples = constant("flat");
        samples.extend(linear("growing"));
        let base = profile(&samples);

        let records: Vec<_> = strategy.detect(&base, &base).collect();
        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|r| r.result == PerformanceChange::NoChange));
    }

    #[test]
    fn test_identical_profiles_only_report_no_change() {
        let base = profile(&linear("f"));
        let records: Vec<_> = LinearRegression::default().detect(&base, &base).collect();

        assert!(records
            .iter()
            .all(|r| r.result == PerformanceChange::NoChange));
    }

    #[test]
    fn test_same_order_uses_thresholds() {
        let base = profile(&scaled("g", 1.0));
        let strategy = LinearRegression::default();

        let small = profile(&scaled("g", 1.10));
        let large = profile(&scaled("g", 1.30));
        let tiny = profile(&scaled("g", 1.02));

        assert_eq!(
            strategy.detect(&base, &small).next().unwrap().result,
            PerformanceChange::MaybeDegradation
        );
        assert_eq!(
            strategy.detect(&base, &large).next().unwrap().result,
            PerformanceChange::Degradation
        );
        assert_eq!(
            strategy.detect(&base, &tiny).next().unwrap().result,
            PerformanceChange::NoChange
        );
    }

    #[test]
    fn test_locations_in_one_profile_only_are_skipped() {
        let mut both = constant("shared");
        both.extend(constant("only_base"));
        let base = profile(&both);
        let target = profile(&constant("shared"));

        let records: Vec<_> = LinearRegression::default().detect(&base, &target).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].location, "shared");
    }

    #[test]
    fn test_zero_baseline_is_unknown_with_infinite_rate() {
        let base = profile(&scaled("z", 0.0));
        let target = profile(&scaled("z", 1.0));

        let record = LinearRegression::default().detect(&base, &target).next().unwrap();
        assert_eq!(record.result, PerformanceChange::Unknown);
        assert_eq!(record.rate_degradation, f64::INFINITY);
    }

    #[test]
    fn test_confidence_is_weakest_fit() {
        let base = profile(&constant("f"));
        let target = profile(&linear("f"));
        let record = LinearRegression::default().detect(&base, &target).next().unwrap();

        assert!(matches!(record.confidence, Confidence::RSquare(r) if (r - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_samples_without_structure_size_use_order() {
        let mut base = profile(&[]);
        for amount in [1.0, 2.0, 3.0] {
            base.resources.push(Resource {
                amount,
                uid: "seq".to_string(),
                kind: "time".to_string(),
                subtype: None,
                structure_unit_size: None,
                extra: Map::new(),
            });
        }

        let samples = samples_by_location(&base);
        assert_eq!(samples["seq"], vec![(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]);
    }

    #[test]
    fn test_output_is_ordered_by_location() {
        let mut samples = constant("zeta");
        samples.extend(constant("alpha"));
        let base = profile(&samples);

        let locations: Vec<_> = LinearRegression::default()
            .detect(&base, &base)
            .map(|r| r.location)
            .collect();
        assert_eq!(locations, vec!["alpha", "zeta"]);
    }
}
