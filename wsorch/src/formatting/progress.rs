//! Progress spinner shown while packages are processed.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Creates a ticking spinner. Lines printed while it runs should go through
/// [`ProgressBar::suspend`] so they are not overdrawn.
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
