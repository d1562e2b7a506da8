//! Change records produced by detection strategies

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CheckError;

/// Verdict of one baseline-vs-target comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PerformanceChange {
    /// Performance got confidently worse
    Degradation,
    /// Performance probably got worse
    MaybeDegradation,
    /// Nothing measurable changed
    NoChange,
    /// The comparison is inconclusive
    Unknown,
    /// Performance probably got better
    MaybeOptimization,
    /// Performance got confidently better
    Optimization,
}

impl PerformanceChange {
    /// Every variant in display order
    pub const ALL: [PerformanceChange; 6] = [
        Self::Degradation,
        Self::MaybeDegradation,
        Self::NoChange,
        Self::Unknown,
        Self::MaybeOptimization,
        Self::Optimization,
    ];

    /// Whether the record is worth persisting
    pub fn is_change(self) -> bool {
        self != Self::NoChange
    }

    /// Degradation or MaybeDegradation
    pub fn is_degradation(self) -> bool {
        matches!(self, Self::Degradation | Self::MaybeDegradation)
    }

    /// Optimization or MaybeOptimization
    pub fn is_optimization(self) -> bool {
        matches!(self, Self::Optimization | Self::MaybeOptimization)
    }

    /// Variant name as persisted
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Degradation => "Degradation",
            Self::MaybeDegradation => "MaybeDegradation",
            Self::NoChange => "NoChange",
            Self::Unknown => "Unknown",
            Self::MaybeOptimization => "MaybeOptimization",
            Self::Optimization => "Optimization",
        }
    }
}

impl fmt::Display for PerformanceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How sure a strategy is about its verdict
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Confidence {
    /// Coefficient of determination of the fitted models
    RSquare(f64),
    /// The strategy gives no confidence measure
    None,
}

impl Confidence {
    /// Kind as persisted: `r_square` or `no`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RSquare(_) => "r_square",
            Self::None => "no",
        }
    }

    /// Numeric rate, 0 without confidence
    pub fn rate(&self) -> f64 {
        match self {
            Self::RSquare(rate) => *rate,
            Self::None => 0.0,
        }
    }

    fn from_parts(kind: &str, rate: f64) -> Self {
        match kind {
            "r_square" => Self::RSquare(rate),
            _ => Self::None,
        }
    }
}

/// Result of comparing one resource location between two profiles
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    /// Verdict
    pub result: PerformanceChange,
    /// Classification label, e.g. "constant" or "linear"
    pub kind: String,
    /// Resource location (uid)
    pub location: String,
    /// Description of the baseline value
    pub from_baseline: String,
    /// Description of the target value
    pub to_target: String,
    /// Confidence of the verdict
    pub confidence: Confidence,
    /// Signed relative change in percent
    pub rate_degradation: f64,
}

/// A persisted change: the record plus what was profiled and what it was compared to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredChange", into = "StoredChange")]
pub struct DetectedChange {
    /// The change itself
    pub change: ChangeRecord,
    /// Command string of the compared configuration
    pub command: String,
    /// Checksum of the minor version the target was compared against
    pub baseline_commit: String,
}

impl DetectedChange {
    /// Records are merged per (location, type, command) when saved
    pub fn merge_key(&self) -> (&str, &str, &str) {
        (&self.change.location, &self.change.kind, &self.command)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredChange {
    result: PerformanceChange,
    #[serde(rename = "type")]
    kind: String,
    location: String,
    from_baseline: String,
    to_target: String,
    confidence_type: String,
    confidence_rate: f64,
    #[serde(with = "rate_repr")]
    rate_degradation: f64,
    command_string: String,
    baseline_commit: String,
}

impl From<StoredChange> for DetectedChange {
    fn from(stored: StoredChange) -> Self {
        Self {
            change: ChangeRecord {
                result: stored.result,
                kind: stored.kind,
                location: stored.location,
                from_baseline: stored.from_baseline,
                to_target: stored.to_target,
                confidence: Confidence::from_parts(&stored.confidence_type, stored.confidence_rate),
                rate_degradation: stored.rate_degradation,
            },
            command: stored.command_string,
            baseline_commit: stored.baseline_commit,
        }
    }
}

impl From<DetectedChange> for StoredChange {
    fn from(detected: DetectedChange) -> Self {
        let change = detected.change;
        Self {
            result: change.result,
            kind: change.kind,
            location: change.location,
            from_baseline: change.from_baseline,
            to_target: change.to_target,
            confidence_type: change.confidence.kind().to_string(),
            confidence_rate: change.confidence.rate(),
            rate_degradation: change.rate_degradation,
            command_string: detected.command,
            baseline_commit: detected.baseline_commit,
        }
    }
}

/// JSON has no infinities, so non-finite rates are stored as labels
mod rate_repr {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(rate: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if rate.is_finite() {
            serializer.serialize_f64(*rate)
        } else if rate.is_nan() {
            serializer.serialize_str("nan")
        } else if *rate > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Label(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(rate) => Ok(rate),
            Repr::Label(label) => match label.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(D::Error::custom(format!("invalid rate '{}'", other))),
            },
        }
    }
}

/// Relative change thresholds in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    maybe: f64,
    confirmed: f64,
}

impl Thresholds {
    /// Create thresholds, requiring `0 <= maybe < confirmed`
    ///
    /// # Examples
    ///
    /// ```
    /// use perfcheck::check::{PerformanceChange, Thresholds};
    ///
    /// let thresholds = Thresholds::new(5.0, 25.0).unwrap();
    /// assert_eq!(thresholds.classify(3.0), PerformanceChange::NoChange);
    /// assert_eq!(thresholds.classify(10.0), PerformanceChange::MaybeDegradation);
    /// assert_eq!(thresholds.classify(-30.0), PerformanceChange::Optimization);
    ///
    /// assert!(Thresholds::new(25.0, 5.0).is_err());
    /// ```
    pub fn new(maybe: f64, confirmed: f64) -> Result<Self, CheckError> {
        if !(maybe >= 0.0 && confirmed > maybe && confirmed.is_finite()) {
            return Err(CheckError::Configuration {
                message: format!(
                    "thresholds must satisfy 0 <= maybe < confirmed, got maybe={} confirmed={}",
                    maybe, confirmed
                ),
            });
        }
        Ok(Self { maybe, confirmed })
    }

    /// Thresholds known to be ordered at compile time
    pub(crate) const fn from_ordered(maybe: f64, confirmed: f64) -> Self {
        Self { maybe, confirmed }
    }

    /// Threshold below which a change is ignored
    pub fn maybe(&self) -> f64 {
        self.maybe
    }

    /// Threshold from which a change is confirmed
    pub fn confirmed(&self) -> f64 {
        self.confirmed
    }

    /// Classify a signed relative change
    ///
    /// A zero rate is never a change, even with a zero `maybe` threshold.
    pub fn classify(&self, rate: f64) -> PerformanceChange {
        let magnitude = rate.abs();
        if rate.is_nan() {
            PerformanceChange::Unknown
        } else if rate == 0.0 || magnitude < self.maybe {
            PerformanceChange::NoChange
        } else if magnitude < self.confirmed {
            if rate > 0.0 {
                PerformanceChange::MaybeDegradation
            } else {
                PerformanceChange::MaybeOptimization
            }
        } else if rate > 0.0 {
            PerformanceChange::Degradation
        } else {
            PerformanceChange::Optimization
        }
    }
}
