//! Command-line interface for `ehi`.
//!
//! # Examples
//!
//! ```bash
//! # Interactive shell on the seeded dashboard
//! ehi
//!
//! # Replay a script of shell commands
//! ehi run smoke.ehi
//!
//! # Visit every route and report problems
//! ehi --latency-ms 20 check
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

/// Ehi Centre admin dashboard, driven from the terminal.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ehi",
    author,
    version,
    about = "Ehi Centre admin dashboard shell",
    long_about = "Navigates the Ehi Centre admin dashboard: paginated record tables, \
                  modal forms and client-side routing, rendered as text."
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, short = 'c', env = "EHI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding `templates/` and `styles/layouts/`
    ///
    /// Replaces the built-in templates
    #[arg(long, env = "EHI_ASSETS")]
    pub assets: Option<PathBuf>,

    /// Base URL to fetch templates and stylesheets from
    #[arg(long, env = "EHI_ASSETS_URL", conflicts_with = "assets")]
    pub assets_url: Option<String>,

    /// Path prefix the dashboard is mounted under
    #[arg(long, env = "EHI_MOUNT")]
    pub mount: Option<String>,

    /// Seed for the generated records
    #[arg(long, short = 's', env = "EHI_SEED")]
    pub seed: Option<u64>,

    /// Simulated backend latency in milliseconds
    #[arg(long, env = "EHI_LATENCY_MS")]
    pub latency_ms: Option<u64>,

    /// Initial rows per page (5, 10, 25, 50 or 100)
    #[arg(long, env = "EHI_PAGE_SIZE")]
    pub page_size: Option<usize>,

    /// Log output format
    #[arg(long, env = "EHI_LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,

    /// Enable verbose logging (repeat for more)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// What to do once the dashboard is up.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read shell commands from stdin (the default)
    Shell,

    /// Run the shell commands in a script file
    Run {
        /// Script to run; `#` starts a comment
        script: PathBuf,
    },

    /// List the routes and the module behind each
    Routes,

    /// Visit every route and report pages that fail to render
    Check,

    /// Write the built-in templates and stylesheets to a directory
    ExportAssets {
        /// Target directory
        dir: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create CLI from an iterator.
    pub fn try_parse_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// The command to run, [`Command::Shell`] when none was given.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Shell)
    }
}
