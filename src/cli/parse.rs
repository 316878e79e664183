//! CLI parse: clap types for scriptdeploy. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// scriptdeploy CLI - reconcile source-controlled scripts with live objects
#[derive(Parser, Debug)]
#[command(name = "scriptdeploy")]
#[command(about = "Reconcile source-controlled script files against deployed live scripts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Disable logging entirely
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Enable verbose logging (debug level, mirrored to stderr)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync snapshots and classify every tracked file
    Check {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Create missing and update modified live scripts, adopting the branch tip
    Adjust {
        /// Also re-parent and rename moved, orphaned or renamed scripts
        #[arg(long)]
        relocate: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the aggregate state of the instance
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List tracked files and their flags
    List {
        /// Only files with at least one flag set
        #[arg(long)]
        flagged: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Drop entries from the tracked list
    Forget {
        /// Filenames to forget
        #[arg(required = true)]
        filenames: Vec<String>,
        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Print the advisory diff recorded by the last pass
    Diff {
        /// Snapshot the live contents are compared with
        #[arg(long, value_enum, default_value_t = DiffTarget::Current)]
        against: DiffTarget,
    },
    /// Read or write the host autoload file
    Autoload {
        #[command(subcommand)]
        command: AutoloadCommands,
    },
    /// Run checks at the configured daily time
    Daemon {
        /// Run one check immediately before waiting
        #[arg(long)]
        run_now: bool,
    },
    /// Inspect the live catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffTarget {
    Current,
    Top,
}

#[derive(Subcommand, Debug)]
pub enum AutoloadCommands {
    /// Print the current autoload file
    Read,
    /// Replace the autoload file with the content of a local file
    Write {
        /// File providing the new content ("-" for stdin)
        #[arg(long)]
        from: PathBuf,
        /// Overwrite an existing autoload file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// Print the container and script tree
    Tree,
}
