//! Command-line interface definitions for six_minute_sync.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Global options can also be provided via environment variables.

use crate::config::Overrides;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for six_minute_sync.
///
/// # Examples
///
/// ```sh
/// # Refresh the cache if a new Thursday episode is due
/// six_minute_sync sync
///
/// # Always hit the listing page, using a custom cache directory
/// six_minute_sync -d ./cache sync --force
///
/// # Show cached favorites as JSON
/// six_minute_sync list --favorites --json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding episodes.json and favorites.json
    #[arg(short = 'd', long, env = "SIX_MINUTE_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Optional path to a YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Listing page to scrape
    #[arg(long, env = "SIX_MINUTE_LISTING_URL", global = true)]
    pub listing_url: Option<String>,

    /// Count calendar days in UTC instead of the configured time zone
    #[arg(long, global = true)]
    pub utc: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Fetch the listing page if the cache is stale and store new episodes
    Sync {
        /// Fetch even when the cache looks fresh
        #[arg(short, long)]
        force: bool,
    },
    /// Report whether the cache is stale without fetching anything
    Check,
    /// Print cached episodes, newest first
    List {
        /// Only show favorite episodes
        #[arg(long)]
        favorites: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Manage favorite episodes
    Favorite {
        #[command(subcommand)]
        action: FavoriteAction,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum FavoriteAction {
    /// Mark an episode as favorite, e.g. "Episode 241121"
    Add { id: String },
    /// Unmark an episode
    Remove { id: String },
    /// Flip the favorite state of an episode
    Toggle { id: String },
    /// Print favorite ids
    List,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            listing_url: self.listing_url.clone(),
            cache_dir: self.cache_dir.clone(),
            utc: self.utc,
        }
    }
}
