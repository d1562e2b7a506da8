//! Error types with contextual suggestions
//!
//! [`CheckError`] is the error of the degradation checking core. Each variant
//! knows:
//! - an actionable suggestion for the user
//! - a sysexits-style exit code for scripted runs
//! - whether a history walk may downgrade it to a warning
//!
//! # Examples
//!
//! ```no_run
//! use perfcheck::config::ConfigStack;
//! use perfcheck::check::DegradationChecker;
//!
//! let config = ConfigStack::default();
//! match DegradationChecker::from_config(&config) {
//!     Ok(_) => println!("checker ready"),
//!     Err(e) => {
//!         eprintln!("{}", e);
//!         if let Some(help) = e.suggestion() {
//!             eprintln!("help: {}", help);
//!         }
//!         std::process::exit(e.exit_code());
//!     }
//! }
//! ```

use thiserror::Error;

use crate::config::ConfigError;
use crate::profile::ConfigTuple;
use crate::store::StoreError;
use crate::vcs::VcsError;

/// Errors raised while checking profiles for degradations
#[derive(Error, Debug)]
pub enum CheckError {
    /// Invalid or incomplete checker configuration
    #[error("configuration error: {message}")]
    Configuration {
        /// What is wrong with the configuration
        message: String,
    },

    /// Configuration lookup failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Two profiles of different configurations were compared
    #[error("incompatible configurations: baseline {baseline} vs target {target}")]
    IncompatibleConfiguration {
        /// Configuration of the baseline profile
        baseline: Box<ConfigTuple>,
        /// Configuration of the target profile
        target: Box<ConfigTuple>,
    },

    /// A detection method name did not resolve to a registered strategy
    #[error("unknown detection strategy '{name}'")]
    UnknownStrategy {
        /// Requested strategy name
        name: String,
        /// Registered strategy names
        available: Vec<String>,
    },

    /// Profile or change-list storage failed
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Version control query failed
    #[error("version control error: {0}")]
    Vcs(#[from] VcsError),

    /// Collecting profiles for a minor version failed
    #[error("pre-collection for {checksum} failed: {message}")]
    Precollection {
        /// Minor version checksum
        checksum: String,
        /// Failure description
        message: String,
    },

    /// Collecting profiles for a minor version ran past its time limit
    #[error("pre-collection for {checksum} timed out after {seconds}s")]
    PrecollectionTimeout {
        /// Minor version checksum
        checksum: String,
        /// Configured limit in seconds
        seconds: u64,
    },
}

impl CheckError {
    /// Get actionable suggestion for resolving this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use perfcheck::error::CheckError;
    ///
    /// let error = CheckError::UnknownStrategy {
    ///     name: "magic".to_string(),
    ///     available: vec!["linear_regression".to_string()],
    /// };
    ///
    /// assert!(error.suggestion().unwrap().contains("linear_regression"));
    /// ```
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Configuration { .. } => Some(
                "Set 'degradation.apply' to 'first' or 'all' and list rules under \
                 [[degradation.strategies]] in .perfcheck/config.toml"
                    .to_string(),
            ),
            Self::Config(ConfigError::MissingKey { key }) => {
                Some(format!("Add '{}' to .perfcheck/config.toml", key))
            }
            Self::Config(ConfigError::InvalidValue { key, expected, .. }) => {
                Some(format!("'{}' must be {}", key, expected))
            }
            Self::Config(ConfigError::Parse { path, .. }) => {
                Some(format!("Fix the TOML syntax in {}", path.display()))
            }
            Self::Config(ConfigError::Io { path, .. }) => {
                Some(format!("Check that {} is readable", path.display()))
            }
            Self::IncompatibleConfiguration { .. } => Some(
                "Only profiles collected with the same command, workload, collector and \
                 postprocessors can be compared"
                    .to_string(),
            ),
            Self::UnknownStrategy { available, .. } => Some(format!(
                "Available strategies: {}",
                available.join(", ")
            )),
            Self::Storage(StoreError::NotFound { .. }) => Some(
                "Register the profile first with 'perfcheck register <rev> <profile>'".to_string(),
            ),
            Self::Storage(_) => Some("Check permissions of the .perfcheck directory".to_string()),
            Self::Vcs(VcsError::InvalidReference { .. }) => {
                Some("Use a commit hash, branch or tag that exists in the repository".to_string())
            }
            Self::Vcs(VcsError::UnsupportedBackend { .. }) => {
                Some("Set 'vcs.type' to 'git' in .perfcheck/config.toml".to_string())
            }
            Self::Vcs(_) => None,
            Self::Precollection { .. } => {
                Some("Check 'degradation.collect_command' or set 'degradation.log_collect = true'".to_string())
            }
            Self::PrecollectionTimeout { .. } => {
                Some("Raise 'degradation.collect_timeout' in .perfcheck/config.toml".to_string())
            }
        }
    }

    /// Get appropriate exit code for this error, following sysexits.h conventions.
    ///
    /// # Examples
    ///
    /// ```
    /// use perfcheck::error::CheckError;
    ///
    /// let error = CheckError::Configuration { message: "missing apply".to_string() };
    /// assert_eq!(error.exit_code(), 78); // EX_CONFIG
    /// ```
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration { .. } => 78, // EX_CONFIG
            Self::Config(_) => 78,
            Self::IncompatibleConfiguration { .. } => 65, // EX_DATAERR
            Self::UnknownStrategy { .. } => 78,
            Self::Storage(StoreError::NotFound { .. }) => 66, // EX_NOINPUT
            Self::Storage(StoreError::Corrupt { .. }) => 65,
            Self::Storage(_) => 74, // EX_IOERR
            Self::Vcs(VcsError::InvalidReference { .. }) => 64, // EX_USAGE
            Self::Vcs(VcsError::UnsupportedBackend { .. }) => 78,
            Self::Vcs(_) => 69,                 // EX_UNAVAILABLE
            Self::Precollection { .. } => 1,
            Self::PrecollectionTimeout { .. } => 75, // EX_TEMPFAIL
        }
    }

    /// Whether a history walk logs this error and moves on instead of stopping
    ///
    /// Errors local to one pairing of profiles are recoverable. Broken
    /// configuration, storage and version control failures are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::IncompatibleConfiguration { .. }
                | Self::UnknownStrategy { .. }
                | Self::Precollection { .. }
                | Self::PrecollectionTimeout { .. }
        )
    }
}

/// Error formatter with colors and structured output
pub struct ErrorFormatter;

impl ErrorFormatter {
    /// Format error with its cause chain and a suggestion when one is known
    pub fn format(error: &anyhow::Error) -> String {
        use console::style;

        let mut output = String::new();
        output.push_str(&format!("{} {}\n", style("error:").red().bold(), error));

        let mut source = error.source();
        let mut indent = 1;
        while let Some(err) = source {
            output.push_str(&format!(
                "{}{} {}\n",
                "  ".repeat(indent),
                style("caused by:").yellow(),
                err
            ));
            source = err.source();
            indent += 1;
        }

        if let Some(suggestion) = Self::find_check_error(error).and_then(CheckError::suggestion) {
            output.push_str(&format!(
                "\n{} {}\n",
                style("help:").cyan().bold(),
                suggestion
            ));
        }

        output
    }

    /// Get exit code from error
    pub fn exit_code(error: &anyhow::Error) -> i32 {
        Self::find_check_error(error)
            .map(CheckError::exit_code)
            .unwrap_or(1)
    }

    /// The CLI wraps core errors in context, so search the whole chain
    fn find_check_error(error: &anyhow::Error) -> Option<&CheckError> {
        error.chain().find_map(|e| e.downcast_ref::<CheckError>())
    }
}
