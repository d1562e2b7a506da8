//! Common test utilities and helpers
//!
//! This module provides shared functionality for integration tests:
//! - Profile and repository fixtures
//! - Assertion helpers for change lists
//!
//! # Usage
//!
//! ```rust,no_run
//! mod common;
//! use common::fixtures;
//!
//! fn test_engine() {
//!     let dir = tempfile::tempdir().unwrap();
//!     let engine = fixtures::engine(fixtures::linear_history(&["a", "b"]), dir.path(), fixtures::ALL_RULES);
//! }
//! ```

pub mod assertions;
pub mod fixtures;

/// Check if a usable git binary is on the path
#[allow(dead_code)]
pub fn has_git() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
