//! Layered configuration for perfcheck
//!
//! This module provides:
//! - [`ConfigStack`]: runtime overrides stacked over local and shared TOML files
//! - [`ConfigLoader`]: reads `.perfcheck/config.toml` and the shared config file
//! - [`ConfigError`]: lookup and parse failures

pub mod loader;
pub mod stack;

pub use loader::{ConfigLoader, LOCAL_CONFIG_PATH, SHARED_CONFIG_ENV};
pub use stack::{ConfigScope, ConfigStack, ConfigValue};

use std::path::PathBuf;
use thiserror::Error;

/// Errors from reading or querying configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No scope defines the key
    #[error("configuration key '{key}' is not set")]
    MissingKey {
        /// Dotted key
        key: String,
    },

    /// The key is set but holds the wrong kind of value
    #[error("configuration key '{key}' must be {expected}, found {found}")]
    InvalidValue {
        /// Dotted key
        key: String,
        /// Description of the accepted values
        expected: String,
        /// The offending value
        found: String,
    },

    /// A configuration file is not valid TOML
    #[error("failed to parse {path}")]
    Parse {
        /// Path of the configuration file
        path: PathBuf,
        #[source]
        /// Parser error
        source: toml_edit::TomlError,
    },

    /// A configuration file exists but could not be read
    #[error("failed to read {path}")]
    Io {
        /// Path of the configuration file
        path: PathBuf,
        #[source]
        /// IO error source
        source: std::io::Error,
    },
}
