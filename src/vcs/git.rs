//! Git backend driven through the `git` command line

use super::{MinorVersion, VcsError, VersionControl};
use crate::infra::{CommandExecutor, RealCommandExecutor};
use std::path::{Path, PathBuf};

// checksum, parents, author, email, date, subject
const INFO_FORMAT: &str = "--format=%H%n%P%n%an%n%ae%n%aI%n%s";

/// Git repository interface with dependency injection for testability
pub struct GitRepository<CE: CommandExecutor = RealCommandExecutor> {
    path: PathBuf,
    cmd_executor: CE,
}

impl GitRepository<RealCommandExecutor> {
    /// Open the repository containing `path` with real command execution
    pub fn open(path: &Path) -> Self {
        Self::with_executor(path, RealCommandExecutor)
    }
}

impl<CE: CommandExecutor> GitRepository<CE> {
    /// Create a GitRepository with a custom command executor (for testing)
    pub fn with_executor(path: &Path, cmd_executor: CE) -> Self {
        Self {
            path: path.to_path_buf(),
            cmd_executor,
        }
    }

    /// Repository path passed to `git -C`
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn classify_failure(&self, reference: &str, stderr: &str) -> VcsError {
        if stderr.contains("not a git repository") {
            VcsError::NotARepository {
                path: self.path.clone(),
            }
        } else if stderr.contains("unknown revision")
            || stderr.contains("bad revision")
            || stderr.contains("ambiguous argument")
            || stderr.contains("bad object")
            || stderr.contains("does not have any commits")
        {
            VcsError::InvalidReference {
                reference: reference.to_string(),
            }
        } else {
            VcsError::CommandFailed(stderr.trim().to_string())
        }
    }
}

impl<CE: CommandExecutor> VersionControl for GitRepository<CE> {
    fn get_minor_version_info(&self, reference: &str) -> Result<MinorVersion, VcsError> {
        // refuse anything git would read as an option
        if reference.is_empty() || reference.starts_with('-') {
            return Err(VcsError::InvalidReference {
                reference: reference.to_string(),
            });
        }

        let revision = format!("{}^{{commit}}", reference);
        let output = self.cmd_executor.execute(
            |cmd| {
                cmd.arg("-C")
                    .arg(&self.path)
                    .args(["log", "-1", INFO_FORMAT])
                    .arg(&revision)
                    .arg("--")
            },
            "git",
        )?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.classify_failure(reference, &stderr));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| VcsError::InvalidUtf8)?;
        parse_info(reference, &stdout)
    }
}

fn parse_info(reference: &str, stdout: &str) -> Result<MinorVersion, VcsError> {
    let mut lines = stdout.lines();
    let checksum = lines.next().unwrap_or_default().trim().to_string();
    if checksum.is_empty() {
        return Err(VcsError::InvalidReference {
            reference: reference.to_string(),
        });
    }
    let parents = lines
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let mut field = || lines.next().unwrap_or_default().to_string();

    Ok(MinorVersion {
        checksum,
        parents,
        author: field(),
        email: field(),
        date: field(),
        description: field(),
    })
}
