//! Rule based selection of detection strategies

use std::collections::BTreeMap;
use std::str::FromStr;
use toml_edit::Item;

use crate::error::CheckError;
use crate::profile::Profile;

/// How many applicable rules contribute a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPolicy {
    /// Only the first applicable rule
    First,
    /// Every applicable rule
    All,
}

impl FromStr for ApplyPolicy {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "all" => Ok(Self::All),
            other => Err(CheckError::Configuration {
                message: format!(
                    "'degradation.apply' must be 'first' or 'all', found '{}'",
                    other
                ),
            }),
        }
    }
}

/// One entry of `[[degradation.strategies]]`
///
/// Every key other than `method` is a selector: `collector` matches the
/// collector name, `postprocessor` must be among the applied postprocessors and
/// any other key must equal the profile header field of that name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionRule {
    /// Selector keys and required values
    pub selectors: BTreeMap<String, String>,
    /// Strategy name, possibly a short name
    pub method: Option<String>,
}

impl DetectionRule {
    /// Rule running `method` on every profile
    pub fn for_method(method: &str) -> Self {
        Self {
            selectors: BTreeMap::new(),
            method: Some(method.to_string()),
        }
    }

    /// Add a selector
    pub fn with_selector(mut self, key: &str, value: &str) -> Self {
        self.selectors.insert(key.to_string(), value.to_string());
        self
    }

    /// Parse a rule from a configuration table
    pub fn from_item(item: &Item) -> Result<Self, CheckError> {
        let table = item.as_table_like().ok_or_else(|| CheckError::Configuration {
            message: format!(
                "'degradation.strategies' entries must be tables, found '{}'",
                item.to_string().trim()
            ),
        })?;

        let mut rule = Self::default();
        for (key, value) in table.iter() {
            let value = scalar(value).ok_or_else(|| CheckError::Configuration {
                message: format!(
                    "rule key '{}' must be a string, number or boolean",
                    key
                ),
            })?;
            if key == "method" {
                rule.method = Some(value);
            } else {
                rule.selectors.insert(key.to_string(), value);
            }
        }
        Ok(rule)
    }

    /// Whether every selector matches the profile
    pub fn is_applicable_for(&self, profile: &Profile) -> bool {
        self.selectors.iter().all(|(key, value)| match key.as_str() {
            "postprocessor" => profile.postprocessor_names().any(|name| name == value),
            "collector" => profile.collector_info.name == *value,
            header_key => profile.header_field(header_key).as_deref() == Some(value.as_str()),
        })
    }
}

fn scalar(item: &Item) -> Option<String> {
    item.as_str()
        .map(str::to_string)
        .or_else(|| item.as_integer().map(|i| i.to_string()))
        .or_else(|| item.as_float().map(|f| f.to_string()))
        .or_else(|| item.as_bool().map(|b| b.to_string()))
}

/// Translate a short strategy name to its canonical name
///
/// Unknown names are returned unchanged.
///
/// # Examples
///
/// ```
/// use perfcheck::check::parse_strategy;
///
/// assert_eq!(parse_strategy("lreg"), "linear_regression");
/// assert_eq!(parse_strategy("custom_method"), "custom_method");
/// ```
pub fn parse_strategy(name: &str) -> &str {
    match name {
        "aat" => "average_amount_threshold",
        "bmoe" => "best_model_order_equality",
        "preg" => "polynomial_regression",
        "lreg" => "linear_regression",
        "fast" => "fast_check",
        other => other,
    }
}

/// Lazily select the strategies applicable to a profile, in rule order
pub fn select_strategies<'a>(
    profile: &'a Profile,
    rules: &'a [DetectionRule],
    policy: ApplyPolicy,
) -> SelectStrategies<'a> {
    SelectStrategies {
        profile,
        rules: rules.iter(),
        policy,
        selected: Vec::new(),
        done: false,
    }
}

/// Iterator returned by [`select_strategies`]
pub struct SelectStrategies<'a> {
    profile: &'a Profile,
    rules: std::slice::Iter<'a, DetectionRule>,
    policy: ApplyPolicy,
    selected: Vec<&'a str>,
    done: bool,
}

impl<'a> Iterator for SelectStrategies<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        for rule in self.rules.by_ref() {
            let Some(method) = rule.method.as_deref() else {
                continue;
            };
            if !rule.is_applicable_for(self.profile) {
                continue;
            }
            let method = parse_strategy(method);
            if self.selected.contains(&method) {
                continue;
            }
            self.selected.push(method);
            if self.policy == ApplyPolicy::First {
                self.done = true;
            }
            return Some(method);
        }
        self.done = true;
        None
    }
}
