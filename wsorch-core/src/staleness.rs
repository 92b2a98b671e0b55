//! Build staleness detection.
//!
//! A package is fresh only when its build marker is the most recently modified
//! file anywhere in the package tree. The marker is written after the build
//! command reports success, so a failed or interrupted build always leaves some
//! other file newer than the marker and the package is rebuilt next time.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

/// Name of the marker file written after a successful build.
pub const SUCCESSFUL_BUILD: &str = ".successful-build";

/// Decides whether packages need rebuilding.
#[derive(Debug, Clone)]
pub struct StalenessDetector {
    output_dir: String,
}

impl Default for StalenessDetector {
    fn default() -> Self {
        Self::new("dist")
    }
}

impl StalenessDetector {
    pub fn new(output_dir: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn marker_path(&self, package_dir: &Path) -> PathBuf {
        package_dir.join(SUCCESSFUL_BUILD)
    }

    pub fn output_path(&self, package_dir: &Path) -> PathBuf {
        package_dir.join(&self.output_dir)
    }

    pub fn needs_build(&self, package_dir: &Path) -> bool {
        if !self.output_path(package_dir).exists() {
            return true;
        }
        match newest_file(package_dir) {
            Some(newest) => newest != self.marker_path(package_dir),
            None => true,
        }
    }

    /// Stamps the marker with the current time. Call only after a successful build.
    pub fn mark_built(&self, package_dir: &Path) -> io::Result<()> {
        let file = File::create(self.marker_path(package_dir))?;
        file.set_modified(SystemTime::now())
    }
}

/// Finds the most recently modified regular file under `dir`.
///
/// Entries are visited in file-name order and symlinks are not followed, so
/// among files sharing the newest timestamp the first one visited wins.
pub fn newest_file(dir: &Path) -> Option<PathBuf> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let modified = match entry.metadata().ok().and_then(|m| m.modified().ok()) {
            Some(t) => t,
            None => continue,
        };
        let is_newer = newest.as_ref().map_or(true, |(t, _)| modified > *t);
        if is_newer {
            newest = Some((modified, entry.into_path()));
        }
    }

    newest.map(|(_, path)| path)
}
