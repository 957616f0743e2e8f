//! Command-line interface components
//!
//! This module contains CLI-specific code for Sharenite Mirror,
//! including argument parsing, command handlers, and sync progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    CacheAction, CacheArgs, Cli, Commands, CoverArgs, GlobalArgs, ListArgs, PrefsArgs, SyncArgs,
};
pub use commands::{
    handle_cache, handle_cover, handle_list, handle_prefs, handle_sync, CommandContext,
};
pub use progress::{progress_message, SyncProgress};
