//! Sync reporter implementation for CLI.

use std::path::Path;

use owo_colors::OwoColorize;
use wsorch_core::{SyncReporter, VersionChange};

/// Prints each range the synchronizer rewrites or would rewrite.
pub struct CliSyncReporter;

impl SyncReporter for CliSyncReporter {
    fn skipped(&self, package: &Path, member: &Path, reason: &str) {
        println!(
            "  {} {}: skipping {} ({})",
            "⚠".yellow(),
            package.display(),
            member.display(),
            reason.bright_black()
        );
    }

    fn changed(&self, change: &VersionChange, dry_run: bool) {
        let old = change.old_range.as_deref().unwrap_or("(none)");
        if dry_run {
            println!(
                "[DRY RUN] Would update {} in {} from {} to {}",
                change.dependency,
                change.package.display(),
                old,
                change.new_range
            );
        } else {
            println!(
                "Updated {} in {} from {} to {}",
                change.dependency,
                change.package.display(),
                old,
                change.new_range
            );
        }
    }
}
