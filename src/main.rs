use clap::{Parser, Subcommand};
use clap_complete::Shell;
use perfcheck::cmd::{self, GlobalOptions};
use std::path::PathBuf;
use std::process;

/// Performance degradation detection across version control history
///
/// perfcheck compares stored performance profiles of a minor version with the
/// profiles of its nearest ancestors and reports degradations and optimizations.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Collect missing profiles before checking
    #[arg(short = 'c', long, global = true)]
    compute_missing: bool,

    /// Print only summaries
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check for performance changes
    Check {
        #[command(subcommand)]
        target: CheckTarget,
    },

    /// Store a profile for a minor version
    Register {
        /// Minor version the profile was collected for
        rev: String,

        /// Profile file (JSON)
        profile: PathBuf,
    },

    /// Print stored changes of a minor version
    Changes {
        /// Minor version
        #[arg(default_value = "HEAD")]
        rev: String,
    },

    /// Write a starter configuration
    Init,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CheckTarget {
    /// Check one minor version against its nearest ancestors
    Head {
        /// Minor version to check
        #[arg(default_value = "HEAD")]
        rev: String,
    },

    /// Check every minor version reachable from a head
    All {
        /// Head of the walk
        #[arg(default_value = "HEAD")]
        rev: String,
    },

    /// Compare two profile files directly
    Profiles {
        /// Baseline profile file
        baseline: PathBuf,

        /// Target profile file
        target: PathBuf,

        /// Minor version to store the changes for (defaults to the target's origin, then HEAD)
        #[arg(long)]
        minor: Option<String>,
    },
}

fn main() {
    // Initialize logger (use RUST_LOG env var to control verbosity)
    env_logger::init();

    let cli = Cli::parse();
    let options = GlobalOptions {
        root: cli.root,
        compute_missing: cli.compute_missing,
        quiet: cli.quiet,
    };

    let result = match &cli.command {
        Some(Commands::Check { target }) => match target {
            CheckTarget::Head { rev } => cmd::cmd_check_head(rev, &options),
            CheckTarget::All { rev } => cmd::cmd_check_all(rev, &options),
            CheckTarget::Profiles {
                baseline,
                target,
                minor,
            } => cmd::cmd_check_profiles(baseline, target, minor.as_deref(), &options),
        },
        Some(Commands::Register { rev, profile }) => cmd::cmd_register(rev, profile, &options),
        Some(Commands::Changes { rev }) => cmd::cmd_changes(rev, &options),
        Some(Commands::Init) => cmd::cmd_init(&options),
        Some(Commands::Completions { shell }) => {
            cmd::cmd_completions(*shell);
            Ok(())
        }
        None => {
            // No subcommand provided, show help
            println!("perfcheck v{}", env!("CARGO_PKG_VERSION"));
            println!("Performance degradation detection across version control history\n");
            println!("Usage: perfcheck <COMMAND>\n");
            println!("Commands:");
            println!("  check     Check for performance changes");
            println!("  register  Store a profile for a minor version");
            println!("  changes   Print stored changes of a minor version");
            println!("  init      Write a starter configuration");
            println!("\nRun 'perfcheck <COMMAND> --help' for more information on a command.");
            Ok(())
        }
    };

    if let Err(e) = result {
        use perfcheck::error::ErrorFormatter;
        eprintln!("{}", ErrorFormatter::format(&e));
        let exit_code = ErrorFormatter::exit_code(&e);
        process::exit(exit_code);
    }
}
