//! Terminal rendering of detected changes
//!
//! Everything here returns styled strings; printing is left to the commands.

use console::{style, StyledObject};
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::check::{DetectedChange, PerformanceChange};
use crate::vcs::MinorVersion;

/// Icon counted once per confirmed optimization
pub const OPTIMIZATION_ICON: char = '+';

/// Icon counted once per confirmed degradation
pub const DEGRADATION_ICON: char = '-';

/// Number of records per verdict
pub type ChangeCounts = BTreeMap<PerformanceChange, usize>;

/// Count the records of a change list per verdict
pub fn count_changes_per_group(changes: &[DetectedChange]) -> ChangeCounts {
    let mut counts = ChangeCounts::new();
    for change in changes {
        *counts.entry(change.change.result).or_default() += 1;
    }
    counts
}

fn count(counts: &ChangeCounts, result: PerformanceChange) -> usize {
    counts.get(&result).copied().unwrap_or(0)
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn colored<D>(result: PerformanceChange, value: D) -> StyledObject<D> {
    match result {
        PerformanceChange::Degradation | PerformanceChange::MaybeDegradation => style(value).red(),
        PerformanceChange::Optimization | PerformanceChange::MaybeOptimization => {
            style(value).green()
        }
        PerformanceChange::NoChange | PerformanceChange::Unknown => style(value).yellow(),
    }
}

fn label(result: PerformanceChange) -> &'static str {
    match result {
        PerformanceChange::Degradation => "Degradation",
        PerformanceChange::MaybeDegradation => "Maybe Degradation",
        PerformanceChange::NoChange => "No Change",
        PerformanceChange::Unknown => "Unknown",
        PerformanceChange::MaybeOptimization => "Maybe Optimization",
        PerformanceChange::Optimization => "Optimization",
    }
}

/// `+` per optimization then `-` per degradation; uncertain verdicts are omitted
pub fn change_counts_string(counts: &ChangeCounts) -> String {
    let optimizations = count(counts, PerformanceChange::Optimization);
    let degradations = count(counts, PerformanceChange::Degradation);
    format!(
        "{}{}",
        style(OPTIMIZATION_ICON.to_string().repeat(optimizations)).green().bold(),
        style(DEGRADATION_ICON.to_string().repeat(degradations)).red().bold()
    )
}

/// One-line summary such as `3 changes | ++-`
pub fn short_change_string(counts: &ChangeCounts) -> String {
    let overall: usize = counts.values().sum();
    let mut line = format!("{} change{}", overall, plural(overall));
    if overall > 0 {
        let _ = write!(line, " | {}", change_counts_string(counts));
    }
    line
}

/// Short change string followed by the optimization and degradation totals
pub fn summary(changes: &[DetectedChange]) -> String {
    let counts = count_changes_per_group(changes);
    let optimizations = count(&counts, PerformanceChange::Optimization);
    let degradations = count(&counts, PerformanceChange::Degradation);
    format!(
        "{}\n{} optimization{}({}), {} degradation{}({})",
        short_change_string(&counts),
        optimizations,
        plural(optimizations),
        OPTIMIZATION_ICON,
        degradations,
        plural(degradations),
        DEGRADATION_ICON
    )
}

/// Header line of a minor version in a history listing
pub fn minor_version_line(minor: &MinorVersion) -> String {
    format!(
        "{}: {}",
        style(minor.checksum.get(..6).unwrap_or(&minor.checksum)).yellow(),
        minor.description.lines().next().unwrap_or("").trim()
    )
}

/// Changes grouped by location, locations in sorted order
pub fn format_changes(changes: &[DetectedChange]) -> String {
    let mut by_location: BTreeMap<&str, Vec<&DetectedChange>> = BTreeMap::new();
    for change in changes {
        by_location
            .entry(change.change.location.as_str())
            .or_default()
            .push(change);
    }

    let mut out = String::new();
    for (location, group) in by_location {
        let _ = writeln!(out, "at {}:", style(location).white().bold());
        for detected in group {
            let record = &detected.change;
            let _ = write!(
                out,
                "\u{2514} {} {}",
                style(&record.kind).cyan(),
                colored(record.result, label(record.result)).bold()
            );
            if record.result.is_change() {
                let (from, to) = if record.result.is_optimization() {
                    (PerformanceChange::Degradation, PerformanceChange::Optimization)
                } else if record.result.is_degradation() {
                    (PerformanceChange::Optimization, PerformanceChange::Degradation)
                } else {
                    (record.result, record.result)
                };
                let _ = write!(
                    out,
                    " from: {} -> to: {}",
                    colored(from, &record.from_baseline),
                    colored(to, &record.to_target)
                );
                if record.confidence.kind() != "no" {
                    let _ = write!(
                        out,
                        " (with confidence {})",
                        style(format!(
                            "{} = {:.4}",
                            record.confidence.kind(),
                            record.confidence.rate()
                        ))
                        .white()
                        .bold()
                    );
                }
            }
            let _ = writeln!(
                out,
                " ({})",
                style(format!("$ {}", detected.command)).magenta().bold()
            );
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{ChangeRecord, Confidence};
    use console::strip_ansi_codes;

    fn change(location: &str, result: PerformanceChange, confidence: Confidence) -> DetectedChange {
        DetectedChange {
            change: ChangeRecord {
                result,
                kind: "linear".to_string(),
                location: location.to_string(),
                from_baseline: "constant(10.00)".to_string(),
                to_target: "linear(55.00)".to_string(),
                confidence,
                rate_degradation: 450.0,
            },
            command: "./sort big".to_string(),
            baseline_commit: "abc".to_string(),
        }
    }

    #[test]
    fn test_count_changes_per_group() {
        let changes = vec![
            change("f", PerformanceChange::Degradation, Confidence::None),
            change("g", PerformanceChange::Degradation, Confidence::None),
            change("h", PerformanceChange::MaybeOptimization, Confidence::None),
        ];

        let counts = count_changes_per_group(&changes);
        assert_eq!(counts[&PerformanceChange::Degradation], 2);
        assert_eq!(counts[&PerformanceChange::MaybeOptimization], 1);
        assert!(!counts.contains_key(&PerformanceChange::Optimization));
    }

    #[test]
    fn test_short_change_string_omits_uncertain_verdicts() {
        let mut counts = ChangeCounts::new();
        counts.insert(PerformanceChange::Optimization, 2);
        counts.insert(PerformanceChange::Degradation, 1);
        counts.insert(PerformanceChange::MaybeDegradation, 4);

        assert_eq!(
            strip_ansi_codes(&short_change_string(&counts)),
            "7 changes | ++-"
        );
    }

    #[test]
    fn test_short_change_string_without_changes() {
        assert_eq!(
            strip_ansi_codes(&short_change_string(&ChangeCounts::new())),
            "0 changes"
        );
    }

    #[test]
    fn test_summary_pluralizes() {
        let changes = vec![change("f", PerformanceChange::Degradation, Confidence::None)];
        let text = strip_ansi_codes(&summary(&changes)).to_string();
        assert!(text.ends_with("0 optimizations(+), 1 degradation(-)"));
    }

    #[test]
    fn test_format_changes_groups_by_location() {
        let changes = vec![
            change("g", PerformanceChange::Degradation, Confidence::RSquare(0.98)),
            change("f", PerformanceChange::Optimization, Confidence::None),
            change("g", PerformanceChange::Unknown, Confidence::None),
        ];

        let text = strip_ansi_codes(&format_changes(&changes)).to_string();
        let f_at = text.find("at f:").unwrap();
        let g_at = text.find("at g:").unwrap();
        assert!(f_at < g_at);
        assert_eq!(text.matches("at g:").count(), 1);
        assert!(text.contains(
            "\u{2514} linear Degradation from: constant(10.00) -> to: linear(55.00) (with confidence r_square = 0.9800) ($ ./sort big)"
        ));
        assert!(text.contains("\u{2514} linear Optimization from: constant(10.00) -> to: linear(55.00) ($ ./sort big)"));
    }

    #[test]
    fn test_minor_version_line_uses_first_description_line() {
        let minor = MinorVersion {
            checksum: "0123456789".to_string(),
            description: "Speed up sort\n\nlong body".to_string(),
            ..MinorVersion::default()
        };
        assert_eq!(
            strip_ansi_codes(&minor_version_line(&minor)),
            "012345: Speed up sort"
        );
    }
}
