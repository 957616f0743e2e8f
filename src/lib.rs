//! Sharenite Mirror Library
//!
//! Keeps a local mirror of a Sharenite game library current with as little
//! re-fetching as possible, and caches cover art lookups for it.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
