//! Average amount threshold strategy
//!
//! Compares the mean amount per location and classifies the relative change.

use std::collections::BTreeMap;

use super::change::{ChangeRecord, Confidence, PerformanceChange, Thresholds};
use super::{relative_change, ChangeIter, DetectionStrategy};
use crate::profile::Profile;

/// Default threshold for a possible change, in percent
pub const DEFAULT_MAYBE_THRESHOLD: f64 = 20.0;
/// Default threshold for a confirmed change, in percent
pub const DEFAULT_THRESHOLD: f64 = 100.0;

/// Average amount threshold strategy
#[derive(Debug, Clone, Copy)]
pub struct AverageAmountThreshold {
    thresholds: Thresholds,
}

impl Default for AverageAmountThreshold {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::from_ordered(DEFAULT_MAYBE_THRESHOLD, DEFAULT_THRESHOLD),
        }
    }
}

impl AverageAmountThreshold {
    /// Strategy with custom thresholds
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

impl DetectionStrategy for AverageAmountThreshold {
    fn name(&self) -> &str {
        "average_amount_threshold"
    }

    fn detect<'p>(&self, baseline: &'p Profile, target: &'p Profile) -> ChangeIter<'p> {
        let thresholds = self.thresholds;
        let target_means = means_by_location(target);

        Box::new(
            means_by_location(baseline)
                .into_iter()
                .filter_map(move |(location, base)| {
                    let targ = *target_means.get(location)?;
                    let rate = relative_change(base, targ);
                    let result = if base == 0.0 && targ != 0.0 {
                        PerformanceChange::Unknown
                    } else {
                        thresholds.classify(rate)
                    };
                    Some(ChangeRecord {
                        result,
                        kind: "constant".to_string(),
                        location: location.to_string(),
                        from_baseline: format!("{:.2}", base),
                        to_target: format!("{:.2}", targ),
                        confidence: Confidence::None,
                        rate_degradation: rate,
                    })
                }),
        )
    }
}

fn means_by_location(profile: &Profile) -> BTreeMap<&str, f64> {
    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for resource in &profile.resources {
        let (sum, count) = sums.entry(resource.uid.as_str()).or_default();
        *sum += resource.amount;
        *count += 1;
    }
    sums.into_iter()
        .map(|(location, (sum, count))| (location, sum / count as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{CollectorInfo, Resource};

    fn profile(amounts: &[(&str, f64)]) -> Profile {
        Profile {
            origin: None,
            header: BTreeMap::new(),
            collector_info: CollectorInfo {
                name: "time".to_string(),
                params: serde_json::Value::Null,
            },
            postprocessors: vec![],
            resources: amounts
                .iter()
                .map(|(uid, amount)| Resource {
                    amount: *amount,
                    uid: uid.to_string(),
                    kind: "time".to_string(),
                    subtype: None,
                    structure_unit_size: None,
                    extra: BTreeMap::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_doubled_average_is_degradation() {
        let base = profile(&[("main", 10.0), ("main", 30.0)]);
        let target = profile(&[("main", 40.0), ("main", 40.0)]);

        let record = AverageAmountThreshold::default()
            .detect(&base, &target)
            .next()
            .unwrap();
        assert_eq!(record.result, PerformanceChange::Degradation);
        assert_eq!(record.rate_degradation, 100.0);
        assert_eq!(record.from_baseline, "20.00");
        assert_eq!(record.confidence, Confidence::None);
    }

    #[test]
    fn test_moderate_drop_is_maybe_optimization() {
        let base = profile(&[("main", 100.0)]);
        let target = profile(&[("main", 70.0)]);

        let record = AverageAmountThreshold::default()
            .detect(&base, &target)
            .next()
            .unwrap();
        assert_eq!(record.result, PerformanceChange::MaybeOptimization);
    }

    #[test]
    fn test_small_noise_is_no_change() {
        let base = profile(&[("main", 100.0)]);
        let target = profile(&[("main", 105.0)]);

        let record = AverageAmountThreshold::default()
            .detect(&base, &target)
            .next()
            .unwrap();
        assert_eq!(record.result, PerformanceChange::NoChange);
    }

    #[test]
    fn test_only_shared_locations_are_compared() {
        let base = profile(&[("a", 1.0), ("b", 1.0)]);
        let target = profile(&[("b", 1.0), ("c", 1.0)]);

        let locations: Vec<_> = AverageAmountThreshold::default()
            .detect(&base, &target)
            .map(|r| r.location)
            .collect();
        assert_eq!(locations, vec!["b"]);
    }
}
