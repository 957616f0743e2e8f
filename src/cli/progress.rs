//! Spinner feedback for synchronization passes
//!
//! The spinner is driven by engine notifications: every working-snapshot
//! update refreshes the message with the current record count and, when the
//! profile is known, the advertised library size.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::app::{Snapshot, Subscription, SyncEngine};

/// Spinner that follows a sync engine
pub struct SyncProgress {
    spinner: ProgressBar,
    subscription: Option<Subscription>,
}

impl SyncProgress {
    /// Create a spinner; a hidden one when `enabled` is false
    pub fn new(enabled: bool) -> Self {
        let spinner = if enabled {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };

        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style.tick_strings(&["◐", "◓", "◑", "◒"]));
        }
        spinner.set_message("Connecting to Sharenite...");
        spinner.enable_steady_tick(Duration::from_millis(120));

        Self {
            spinner,
            subscription: None,
        }
    }

    /// Follow `engine`'s snapshot updates until [`SyncProgress::finish`]
    pub fn attach(&mut self, engine: &SyncEngine) {
        let spinner = self.spinner.clone();
        self.subscription = Some(engine.subscribe(move |snapshot| {
            spinner.set_message(progress_message(snapshot));
        }));
    }

    /// Replace the spinner message
    pub fn set_message(&self, message: impl Into<String>) {
        self.spinner.set_message(message.into());
    }

    /// Stop following the engine and clear the spinner
    pub fn finish(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.spinner.finish_and_clear();
    }
}

/// Message shown for a working snapshot
pub fn progress_message(snapshot: &Snapshot) -> String {
    match &snapshot.profile {
        Some(profile) if profile.total_games > 0 => format!(
            "Synced {} of {} games for {}",
            snapshot.len(),
            profile.total_games,
            profile.username
        ),
        _ => format!("Synced {} games", snapshot.len()),
    }
}
