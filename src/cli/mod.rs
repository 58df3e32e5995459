//! Command-line interface.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// showfeed - watches release feeds and downloads new episodes of tracked shows
#[derive(Parser)]
#[command(name = "showfeed")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as background daemon with scheduler
    #[command(alias = "d")]
    Daemon,

    /// Run a single reconciliation cycle over all feeds
    #[command(alias = "c")]
    Check,

    /// Manage the watchlist
    Shows {
        #[command(subcommand)]
        command: ShowCommands,
    },

    /// Show download history per show, most recent first
    #[command(alias = "h")]
    History {
        /// Only this show
        #[arg(long)]
        show: Option<String>,

        /// Number of entries per show
        #[arg(long, default_value_t = crate::constants::limits::DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },

    /// Copy a finished download to its show's destination
    Complete {
        /// Release name as reported by the download client
        release_name: String,

        /// Directory the release was downloaded into
        download_dir: PathBuf,
    },

    /// Create default config file
    Init,
}

#[derive(Subcommand)]
pub enum ShowCommands {
    /// List watched shows
    #[command(alias = "ls")]
    List,

    /// List removed shows
    Removed,

    /// Watch one or more shows
    Add {
        #[arg(required = true)]
        names: Vec<String>,

        /// Copy completed downloads of these shows here
        #[arg(long)]
        copy_to: Option<PathBuf>,

        /// Only accept releases from this tracker domain
        #[arg(long)]
        tracker: Option<String>,
    },

    /// Stop watching one or more shows
    #[command(alias = "rm")]
    Remove {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Watch a removed show again
    Restore { name: String },
}

pub use commands::*;
