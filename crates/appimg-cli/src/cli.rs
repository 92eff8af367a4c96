use clap::{Parser, Subcommand};

/// AppImage installer and lifecycle manager.
#[derive(Debug, Parser)]
#[command(name = "appimg", version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all logging below error level.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit structured JSON log lines instead of the default compact format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable ANSI color in log and progress output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Disable progress bars.
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Path to a config file, overriding the default XDG location.
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install one or more applications, given GitHub URLs or catalog keys.
    Install {
        /// GitHub repository URLs (https://github.com/owner/repo[@tag]) or catalog keys.
        targets: Vec<String>,

        /// Reinstall even if already present at the expected install path.
        #[arg(short, long)]
        force: bool,

        /// Skip integrity verification.
        #[arg(long)]
        no_verify: bool,

        /// Maximum number of targets installed concurrently.
        #[arg(short, long)]
        concurrency: Option<usize>,
    },

    /// Remove an installed application's binary, icon, desktop entry, and config record.
    Remove {
        /// The application's canonical name (catalog key, or GitHub repo name for URL installs).
        name: String,
    },

    /// List installed applications.
    List,
}
