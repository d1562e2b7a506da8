//! Completions command implementation
//!
//! Handles the `perfcheck completions` command which generates
//! shell completion scripts for bash, zsh, fish, etc.

use clap_complete::{generate, Shell};
use std::io::Write;

/// Generate shell completion scripts
///
/// Outputs completion script for the specified shell to stdout.
/// Users can redirect this to their shell's completion directory.
///
/// # Examples
///
/// ```bash
/// # Bash
/// perfcheck completions bash > /etc/bash_completion.d/perfcheck
///
/// # Zsh
/// perfcheck completions zsh > ~/.zfunc/_perfcheck
///
/// # Fish
/// perfcheck completions fish > ~/.config/fish/completions/perfcheck.fish
/// ```
pub fn cmd_completions(shell: Shell) {
    write_completions(shell, &mut std::io::stdout());
}

/// Write the completion script for `shell` into `out`
pub fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = command();
    generate(shell, &mut cmd, "perfcheck", out);
}

// Cli lives in main.rs, so the command tree is rebuilt here
fn command() -> clap::Command {
    use clap::{Arg, ArgAction, Command};

    let rev = || Arg::new("rev").default_value("HEAD");

    Command::new("perfcheck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Performance degradation detection across version control history")
        .arg(
            Arg::new("root")
                .long("root")
                .value_name("DIR")
                .help("Project root")
                .global(true),
        )
        .arg(
            Arg::new("compute-missing")
                .short('c')
                .long("compute-missing")
                .help("Collect missing profiles before checking")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Print only summaries")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("check")
                .about("Check for performance changes")
                .subcommand(Command::new("head").about("Check one minor version").arg(rev()))
                .subcommand(Command::new("all").about("Check the whole history").arg(rev()))
                .subcommand(
                    Command::new("profiles")
                        .about("Compare two profile files")
                        .arg(Arg::new("baseline").required(true))
                        .arg(Arg::new("target").required(true))
                        .arg(Arg::new("minor").long("minor")),
                ),
        )
        .subcommand(
            Command::new("register")
                .about("Store a profile for a minor version")
                .arg(Arg::new("rev").required(true))
                .arg(Arg::new("profile").required(true)),
        )
        .subcommand(
            Command::new("changes")
                .about("Print stored changes of a minor version")
                .arg(rev()),
        )
        .subcommand(Command::new("init").about("Write a starter configuration"))
        .subcommand(Command::new("completions").about("Generate shell completions"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_command_is_valid() {
        command().debug_assert();
    }

    #[test]
    fn test_completions_for_all_shells_mention_subcommands() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell] {
            let mut out = Vec::new();
            write_completions(shell, &mut out);
            let script = String::from_utf8(out).unwrap();
            assert!(script.contains("perfcheck"), "{:?}", shell);
            assert!(script.contains("register"), "{:?}", shell);
        }
    }
}
