#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! perfcheck library
//!
//! This library detects performance degradations between minor versions of a
//! project. Profiles are stored per minor version; the history engine pairs
//! each profile with the nearest ancestor profile of the same configuration
//! and runs the configured detection strategies over the pair.
//!
//! # Basic Example
//!
//! Comparing two profiles with an explicit rule set:
//!
//! ```
//! use perfcheck::check::{
//!     ApplyPolicy, DegradationChecker, DetectionRule, PerformanceChange, StrategyRegistry,
//! };
//! use perfcheck::profile::Profile;
//! use std::sync::Arc;
//!
//! let baseline = Profile::from_json(
//!     r#"{"collector_info": {"name": "time"}, "resources": [{"amount": 10, "uid": "main"}]}"#,
//! )?;
//! let target = Profile::from_json(
//!     r#"{"collector_info": {"name": "time"}, "resources": [{"amount": 40, "uid": "main"}]}"#,
//! )?;
//!
//! let checker = DegradationChecker::new(
//!     Arc::new(StrategyRegistry::with_defaults()),
//!     vec![DetectionRule::for_method("aat")],
//!     ApplyPolicy::First,
//! );
//! let records: Vec<_> = checker.compare(&baseline, &target)?.collect();
//! assert_eq!(records[0].result, PerformanceChange::Degradation);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Advanced Example: Checking History
//!
//! Walking an in-memory history with a temporary profile store:
//!
//! ```
//! use perfcheck::check::DegradationChecker;
//! use perfcheck::config::ConfigStack;
//! use perfcheck::engine::HistoryEngine;
//! use perfcheck::profile::Profile;
//! use perfcheck::store::FsProfileStore;
//! use perfcheck::vcs::InMemoryRepository;
//! use tempfile::TempDir;
//!
//! let mut config = ConfigStack::new();
//! config.push_toml("local", "[degradation]\napply = \"all\"\n[[degradation.strategies]]\nmethod = \"aat\"")?;
//!
//! let mut repo = InMemoryRepository::new();
//! repo.add_commit("a1", &[]).add_commit("b2", &["a1"]);
//!
//! let workspace = TempDir::new()?;
//! let engine = HistoryEngine::new(
//!     repo,
//!     FsProfileStore::open(workspace.path()),
//!     DegradationChecker::from_config(&config)?,
//! );
//!
//! let profile = |amount: f64| {
//!     Profile::from_json(&format!(
//!         r#"{{"collector_info": {{"name": "time"}}, "resources": [{{"amount": {}, "uid": "main"}}]}}"#,
//!         amount
//!     ))
//! };
//! engine.store().register("a1", &profile(10.0)?)?;
//! engine.store().register("b2", &profile(40.0)?)?;
//!
//! let changes = engine.check_history("b2")?;
//! assert_eq!(changes.len(), 1);
//! assert_eq!(changes[0].baseline_commit, "a1");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Detection strategies, rule selection and pairwise checking
pub mod check;
/// Command handlers for CLI operations
pub mod cmd;
/// Pre-collection of profiles before checking
pub mod collect;
/// Layered configuration
pub mod config;
/// History degradation engine
pub mod engine;
/// Enhanced error types with contextual suggestions
pub mod error;
/// Infrastructure traits for filesystem and command execution
pub mod infra;
/// Performance profile model
pub mod profile;
/// Terminal rendering of detected changes
pub mod report;
/// Profile and change-list storage
pub mod store;
/// Version control access
pub mod vcs;
