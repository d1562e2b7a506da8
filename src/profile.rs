//! Performance profile documents
//!
//! A profile is produced by an external collector and describes one run of one
//! command under one collector/postprocessor chain. The [`ConfigTuple`] of a
//! profile is its identity for degradation checking: only profiles with equal
//! tuples are ever compared.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Identity of the collector that produced a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorInfo {
    /// Collector name (e.g. "time", "memory", "complexity")
    pub name: String,
    /// Collector-specific parameters
    #[serde(default)]
    pub params: Value,
}

/// One postprocessor applied to the profile after collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostprocessorInfo {
    /// Postprocessor name (e.g. "regression_analysis")
    pub name: String,
    /// Postprocessor parameters
    #[serde(default)]
    pub params: Value,
}

/// A single measured resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Measured amount (time, bytes, ...)
    pub amount: f64,
    /// Location tag of the measurement (function, call site, allocation site)
    pub uid: String,
    /// Resource type (e.g. "time", "memory", "mixed")
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Resource subtype
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Size of the processed structure, the independent variable of a measurement
    #[serde(
        rename = "structure-unit-size",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub structure_unit_size: Option<f64>,
    /// Remaining structural metadata (call depth, sequence number, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Performance profile document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Checksum of the minor version the profile was collected for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Arbitrary metadata; `cmd`, `args` and `workload` take part in the configuration
    #[serde(default)]
    pub header: BTreeMap<String, Value>,
    /// Collector identity
    pub collector_info: CollectorInfo,
    /// Applied postprocessors, in order
    #[serde(default)]
    pub postprocessors: Vec<PostprocessorInfo>,
    /// Measured resources
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Profile {
    /// Parse a profile from its JSON representation
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str(contents)
    }

    /// Serialize the profile to pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Header field rendered as a string, if present
    ///
    /// String values are returned verbatim, everything else in its JSON form.
    pub fn header_field(&self, key: &str) -> Option<String> {
        self.header.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Names of the applied postprocessors
    pub fn postprocessor_names(&self) -> impl Iterator<Item = &str> {
        self.postprocessors.iter().map(|p| p.name.as_str())
    }

    /// Configuration tuple identifying this profile
    pub fn config_tuple(&self) -> ConfigTuple {
        ConfigTuple {
            command: self.header_field("cmd").unwrap_or_default(),
            args: self.header_field("args").unwrap_or_default(),
            workload: self.header_field("workload").unwrap_or_default(),
            collector: self.collector_info.name.clone(),
            postprocessors: self.postprocessor_names().map(str::to_string).collect(),
            collector_params: canonical_params(&self.collector_info.params),
        }
    }
}

/// serde_json maps are ordered, so the compact form is canonical
fn canonical_params(params: &Value) -> String {
    match params {
        Value::Null => String::new(),
        Value::Object(map) if map.is_empty() => String::new(),
        other => other.to_string(),
    }
}

/// Identity of a profile's collection setup
///
/// Field order matters: it is the order in which tuples sort and are displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigTuple {
    /// Profiled command
    pub command: String,
    /// Command arguments
    pub args: String,
    /// Workload passed to the command
    pub workload: String,
    /// Collector name
    pub collector: String,
    /// Postprocessor names, in application order
    pub postprocessors: Vec<String>,
    /// Canonical JSON of collector parameters (empty when there are none)
    #[serde(default)]
    pub collector_params: String,
}

impl ConfigTuple {
    /// Human readable command string: command, arguments and workload
    ///
    /// # Examples
    ///
    /// ```
    /// use perfcheck::profile::ConfigTuple;
    ///
    /// let config = ConfigTuple {
    ///     command: "./sort".to_string(),
    ///     args: "-q".to_string(),
    ///     workload: String::new(),
    ///     collector: "time".to_string(),
    ///     postprocessors: vec![],
    ///     collector_params: String::new(),
    /// };
    /// assert_eq!(config.to_cmdstr(), "./sort -q");
    /// ```
    pub fn to_cmdstr(&self) -> String {
        [&self.command, &self.args, &self.workload]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ConfigTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "('{}', '{}', '{}', '{}'",
            self.command, self.args, self.workload, self.collector
        )?;
        for post in &self.postprocessors {
            write!(f, ", '{}'", post)?;
        }
        if !self.collector_params.is_empty() {
            write!(f, ", {}", self.collector_params)?;
        }
        write!(f, ")")
    }
}
