//! Clap derive structures for the `nasdl` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nasdl -- manage downloads on an OpenMediaVault NAS
#[derive(Debug, Parser)]
#[command(
    name = "nasdl",
    version,
    about = "Queue and monitor downloads on a NAS download manager",
    long_about = "Talks to the Downloader plugin of an OpenMediaVault NAS over its\n\
        JSON-RPC interface. Sessions are established on demand and re-established\n\
        once if a call fails.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// NAS profile to use
    #[arg(long, short = 'p', env = "NASDL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Output format
    #[arg(long, short = 'o', env = "NASDL_OUTPUT", default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Prompt for the password instead of using a stored one
    #[arg(long, global = true)]
    pub ask_password: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Plain text, one identifier per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the profile's settings can log in
    Test,

    /// List download tasks
    #[command(alias = "ls")]
    Tasks,

    /// Queue a URL for download
    Add {
        /// URL to download
        url: String,

        /// UUID of the shared folder to save into (see `nasdl folders`)
        #[arg(long, short = 'f')]
        folder: String,
    },

    /// Start a queued download
    Start {
        /// Task UUID
        uuid: String,
    },

    /// Delete a download task
    #[command(alias = "rm")]
    Delete {
        /// Task UUID
        uuid: String,
    },

    /// List shared folders downloads can be saved into
    Folders,

    /// Show Downloader plugin information
    Info,

    /// Poll the task list until interrupted
    Poll {
        /// Seconds between polls (defaults to the configured interval)
        #[arg(long, short = 'i')]
        interval: Option<u64>,
    },
}
