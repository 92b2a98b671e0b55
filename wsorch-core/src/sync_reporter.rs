//! Trait for reporting dependent version synchronization.

use std::path::Path;

use crate::sync::VersionChange;

/// Receives progress from the version synchronizer so the core never writes
/// to stdout/stderr itself.
pub trait SyncReporter: Send + Sync {
    /// Called for every workspace member considered for `package`.
    fn considering(&self, _package: &Path, _member: &Path) {}

    /// Called when a member is skipped because its manifest is unusable.
    fn skipped(&self, _package: &Path, _member: &Path, _reason: &str) {}

    /// Called for each out-of-date range; `dry_run` means nothing was written.
    fn changed(&self, change: &VersionChange, dry_run: bool);
}

/// Reporter that discards everything; the synchronizer still logs through `tracing`.
pub struct SilentReporter;

impl SyncReporter for SilentReporter {
    fn changed(&self, _change: &VersionChange, _dry_run: bool) {}
}
