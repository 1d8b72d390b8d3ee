//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Android bugreport analyzer.
///
/// Splits a bugreport into sections, parses its logs and reports timestamp
/// problems and thread deadlocks.
#[derive(Debug, Parser)]
#[command(name = "br", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Which dump to read and how.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Bugreport file (plain, gzip or zip); `-` reads stdin.
    pub file: PathBuf,

    /// Accept input without a dumpstate header. Lines outside any section
    /// go to SECTION (`--partial=SECTION`, defaults to the configured
    /// partial section).
    #[arg(long, value_name = "SECTION", num_args = 0..=1, require_equals = true)]
    pub partial: Option<Option<String>>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the sections of a dump.
    Sections {
        #[command(flatten)]
        input: InputArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Write every section to its own file.
    Export {
        #[command(flatten)]
        input: InputArgs,

        /// Destination directory (defaults to the configured output dir).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Parse the log sections.
    Logs {
        #[command(flatten)]
        input: InputArgs,

        /// Only keep lines in `[MM-DD/]HH[:MM[:SS[.mmm]]]..[MM-DD/]HH[:MM[:SS[.mmm]]]`.
        #[arg(long)]
        window: Option<String>,

        /// Print all logs merged into one timeline.
        #[arg(long)]
        merged: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Summarize a dump: metadata, logs and findings.
    Report {
        #[command(flatten)]
        input: InputArgs,

        /// Only keep log lines in this window.
        #[arg(long)]
        window: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
