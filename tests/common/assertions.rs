//! Assertion helpers for change lists

#![allow(dead_code)]

use perfcheck::check::{ChangeRecord, DetectedChange, PerformanceChange};

/// Assert that every record reports no change
pub fn assert_only_no_change<I: IntoIterator<Item = ChangeRecord>>(records: I) {
    for record in records {
        assert_eq!(
            record.result,
            PerformanceChange::NoChange,
            "unexpected {} at {} ({} -> {})",
            record.result,
            record.location,
            record.from_baseline,
            record.to_target
        );
    }
}

/// Find the single change at `location` or panic with the list
pub fn change_at<'a>(changes: &'a [DetectedChange], location: &str, kind: &str) -> &'a DetectedChange {
    let matching: Vec<_> = changes
        .iter()
        .filter(|c| c.change.location == location && c.change.kind == kind)
        .collect();
    assert_eq!(
        matching.len(),
        1,
        "expected one {} change at {}, got {:#?}",
        kind,
        location,
        changes
    );
    matching[0]
}

/// Assert that no persisted change is a `NoChange` record
pub fn assert_filtered(changes: &[DetectedChange]) {
    assert!(
        changes.iter().all(|c| c.change.result.is_change()),
        "NoChange records must be filtered: {:#?}",
        changes
    );
}

/// Assert that `rate` is within `tolerance` of `expected`
pub fn assert_rate_near(rate: f64, expected: f64, tolerance: f64) {
    assert!(
        (rate - expected).abs() <= tolerance,
        "rate {} not within {} of {}",
        rate,
        tolerance,
        expected
    );
}
