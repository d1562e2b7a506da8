//! Pre-collection of profiles before checking
//!
//! When `degradation.collect_before_check` is set, every minor version is
//! collected once before its profiles are indexed. Failures never stop a
//! check; they are logged and the minor version is still marked as done.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ConfigStack;
use crate::error::CheckError;
use crate::infra::{CommandExecutor, RealCommandExecutor};
use crate::vcs::MinorVersion;

/// Default hard limit for one collection run, in seconds
pub const DEFAULT_COLLECT_TIMEOUT: u64 = 1800;

/// Placeholder replaced by the checksum in the collection command
pub const CHECKSUM_PLACEHOLDER: &str = "{checksum}";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Collection capability
pub trait Collector {
    /// Collect profiles for a minor version
    fn run_for(&self, minor: &MinorVersion) -> Result<(), CheckError>;
}

/// Collector running a shell command template under a timeout
pub struct CommandCollector<CE: CommandExecutor = RealCommandExecutor> {
    template: String,
    timeout: Duration,
    log_dir: Option<PathBuf>,
    cmd_executor: CE,
}

impl CommandCollector<RealCommandExecutor> {
    /// Collector for `template`, with `{checksum}` substituted per run
    pub fn new(template: impl Into<String>, timeout: Duration) -> Self {
        Self::with_executor(template, timeout, RealCommandExecutor)
    }
}

impl<CE: CommandExecutor> CommandCollector<CE> {
    /// Collector with a custom command executor
    pub fn with_executor(template: impl Into<String>, timeout: Duration, cmd_executor: CE) -> Self {
        Self {
            template: template.into(),
            timeout,
            log_dir: None,
            cmd_executor,
        }
    }

    /// Write the output of every run to `<dir>/<checksum>-precollect.log`
    pub fn log_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Command line for a checksum
    pub fn command_for(&self, checksum: &str) -> String {
        self.template.replace(CHECKSUM_PLACEHOLDER, checksum)
    }

    fn log_file(&self, dir: &Path, checksum: &str) -> io::Result<File> {
        std::fs::create_dir_all(dir)?;
        File::create(dir.join(format!("{}-precollect.log", checksum)))
    }

    fn wait(&self, child: &mut Child, checksum: &str) -> Result<(), CheckError> {
        let started_at = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                Ok(Some(status)) => {
                    return Err(CheckError::Precollection {
                        checksum: checksum.to_string(),
                        message: format!("collection command exited with {}", status),
                    })
                }
                Ok(None) if started_at.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CheckError::PrecollectionTimeout {
                        checksum: checksum.to_string(),
                        seconds: self.timeout.as_secs(),
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL.min(self.timeout)),
                Err(e) => return Err(precollection_error(checksum, e)),
            }
        }
    }
}

impl<CE: CommandExecutor> Collector for CommandCollector<CE> {
    fn run_for(&self, minor: &MinorVersion) -> Result<(), CheckError> {
        let checksum = minor.checksum.as_str();
        let command = self.command_for(checksum);
        log::debug!("Pre-collecting {}: {}", minor.short_checksum(), command);

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&command).stdin(Stdio::null());
        match &self.log_dir {
            Some(dir) => {
                let log = self
                    .log_file(dir, checksum)
                    .map_err(|e| precollection_error(checksum, e))?;
                let err_log = log.try_clone().map_err(|e| precollection_error(checksum, e))?;
                cmd.stdout(log).stderr(err_log);
            }
            None => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        let mut child = self
            .cmd_executor
            .spawn(&mut cmd)
            .map_err(|e| precollection_error(checksum, e))?;
        self.wait(&mut child, checksum)
    }
}

fn precollection_error(checksum: &str, error: io::Error) -> CheckError {
    CheckError::Precollection {
        checksum: checksum.to_string(),
        message: error.to_string(),
    }
}

/// Runs a collector at most once per checksum
///
/// The set of collected checksums lives as long as the precollector; call
/// [`Precollector::reset`] to collect again.
pub struct Precollector {
    collector: Box<dyn Collector>,
    collected: Mutex<HashSet<String>>,
}

impl Precollector {
    /// Wrap a collector
    pub fn new(collector: impl Collector + 'static) -> Self {
        Self {
            collector: Box::new(collector),
            collected: Mutex::new(HashSet::new()),
        }
    }

    /// Build from `degradation.collect_before_check` and related keys
    ///
    /// Returns `None` when pre-collection is disabled. `log_dir` receives the
    /// logs if `degradation.log_collect` is set.
    pub fn from_config(config: &ConfigStack, log_dir: &Path) -> Result<Option<Self>, CheckError> {
        if !config.lookup_or("degradation.collect_before_check", false)? {
            return Ok(None);
        }

        let template: String = config.lookup_or("degradation.collect_command", String::new())?;
        if template.trim().is_empty() {
            return Err(CheckError::Configuration {
                message: "'degradation.collect_before_check' is set but 'degradation.collect_command' is missing"
                    .to_string(),
            });
        }
        let timeout = Duration::from_secs(
            config.lookup_or("degradation.collect_timeout", DEFAULT_COLLECT_TIMEOUT)?,
        );

        let mut collector = CommandCollector::new(template, timeout);
        if config.lookup_or("degradation.log_collect", false)? {
            collector = collector.log_to(log_dir);
        }
        Ok(Some(Self::new(collector)))
    }

    /// Collect `minor` unless it was already collected
    ///
    /// Returns whether the collector ran. A failed run is logged and still
    /// counts as collected.
    pub fn ensure_collected(&self, minor: &MinorVersion) -> bool {
        if !self.collected.lock().insert(minor.checksum.clone()) {
            return false;
        }
        if let Err(e) = self.collector.run_for(minor) {
            log::warn!("{}", e);
        }
        true
    }

    /// Whether a checksum was already collected
    pub fn is_collected(&self, checksum: &str) -> bool {
        self.collected.lock().contains(checksum)
    }

    /// Forget every collected checksum
    pub fn reset(&self) {
        self.collected.lock().clear();
    }
}
