use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "dropsave")]
#[command(about = "Have Dropbox download URLs into your account and track the jobs", version)]
pub struct Cli {
    /// Path to config file (default: ./dropsave.ron)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding persisted job state (overrides the config file)
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask Dropbox to save a URL at a path
    Submit {
        /// Destination path in Dropbox, e.g. /Downloads/file.zip
        #[arg(long, default_value = "")]
        path: String,

        /// URL Dropbox should download
        #[arg(long, default_value = "")]
        url: String,
    },

    /// Show tracked jobs
    List {
        /// Print the raw job mapping as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a job from the table
    Delete {
        /// Job ID to remove
        id: String,
    },

    /// Check every pending job once
    Refresh,

    /// Poll pending jobs until interrupted
    Watch {
        /// Exit once no job is pending
        #[arg(long)]
        until_settled: bool,
    },
}
