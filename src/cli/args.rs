//! Command-line argument parsing for Sharenite Mirror
//!
//! This module defines the CLI structure using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::GamePreferences;

/// Sharenite Mirror - keep a local copy of a Sharenite game library
#[derive(Parser, Debug)]
#[command(
    name = "sharenite_mirror",
    version,
    about = "Mirror a Sharenite game library locally",
    long_about = "Keeps a local mirror of a public Sharenite game library current with minimal re-fetching,
and caches cover art lookups for the games in it."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Store directory path
    #[arg(long, global = true, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Sharenite username (overrides config and SHARENITE_USERNAME)
    #[arg(short, long, global = true)]
    pub user: Option<String>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synchronize the local mirror with Sharenite
    Sync(SyncArgs),

    /// List games from the local mirror
    List(ListArgs),

    /// Set favorite/completed flags for a game
    Prefs(PrefsArgs),

    /// Look up or override a game's cover
    Cover(CoverArgs),

    /// Cover cache management
    Cache(CacheArgs),
}

/// Arguments for the sync command
#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Ignore the stored snapshot and walk every page
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the list command
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Only favorites
    #[arg(long)]
    pub favorites: bool,

    /// Only completed games
    #[arg(long)]
    pub completed: bool,

    /// Only games that have been played
    #[arg(long)]
    pub played: bool,

    /// Maximum number of games to show
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for the prefs command
#[derive(Args, Debug, Clone)]
pub struct PrefsArgs {
    /// Game identifier
    pub id: String,

    /// Mark or unmark as favorite
    #[arg(long)]
    pub favorite: Option<bool>,

    /// Mark or unmark as completed
    #[arg(long)]
    pub completed: Option<bool>,
}

/// Arguments for the cover command
#[derive(Args, Debug, Clone)]
pub struct CoverArgs {
    /// Game title to look up
    pub title: String,

    /// Pin this URL as the cover instead of looking it up
    #[arg(long, value_name = "URL", conflicts_with = "none")]
    pub set: Option<String>,

    /// Pin "no cover" for this title
    #[arg(long)]
    pub none: bool,
}

/// Arguments for cover cache management
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cover cache actions
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show cache statistics
    Stats,

    /// Remove every cached cover, including manual overrides
    Clear,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl PrefsArgs {
    /// At least one flag must be given
    pub fn validate(&self) -> Result<(), String> {
        if self.favorite.is_none() && self.completed.is_none() {
            return Err("Specify --favorite and/or --completed".to_string());
        }
        Ok(())
    }

    pub fn preferences(&self) -> GamePreferences {
        GamePreferences {
            favorite: self.favorite,
            completed: self.completed,
        }
    }
}

impl CoverArgs {
    /// The manual override requested, if any
    pub fn manual_value(&self) -> Option<Option<String>> {
        if self.none {
            Some(None)
        } else {
            self.set.clone().map(Some)
        }
    }
}
