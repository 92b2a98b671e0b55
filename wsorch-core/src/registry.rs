//! Package discovery and selection.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::WorkspaceConfig;
use crate::error::Result;
use crate::manifest::MANIFEST_FILE;
use crate::package::{Package, Selection};

/// Enumerates the packages of a workspace.
///
/// The configured order comes first, as a hand-maintained approximation of the
/// real build order; any other directory under the packages directory that holds
/// a manifest is appended after it, sorted by name.
pub struct PackageRegistry {
    root: PathBuf,
    packages_dir: PathBuf,
    order: Vec<PathBuf>,
}

impl PackageRegistry {
    pub fn new(root: impl Into<PathBuf>, config: &WorkspaceConfig) -> Self {
        Self {
            root: root.into(),
            packages_dir: PathBuf::from(&config.packages_dir),
            order: config.order.iter().map(PathBuf::from).collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn list_packages(&self) -> Result<Vec<Package>> {
        let mut packages: Vec<Package> = Vec::with_capacity(self.order.len());

        for path in &self.order {
            if self.root.join(path).is_dir() {
                packages.push(Package::new(path));
            } else {
                debug!(package = %path.display(), "listed package not present, skipping");
            }
        }

        let scan_dir = self.root.join(&self.packages_dir);
        if !scan_dir.is_dir() {
            return Ok(packages);
        }

        let discovered = WalkDir::new(&scan_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir() && e.path().join(MANIFEST_FILE).is_file());

        for entry in discovered {
            let candidate = self.packages_dir.join(entry.file_name());
            if !packages.iter().any(|p| p.path == candidate) {
                packages.push(Package::new(candidate));
            }
        }

        Ok(packages)
    }

    /// Lists every package, then applies `selection`.
    pub fn select(&self, selection: &Selection) -> Result<Vec<Package>> {
        let all = self.list_packages()?;
        Ok(filter_packages(all, selection))
    }
}

/// Keeps packages whose short name is in the include set (all, when it is
/// empty) and not in the exclude set, preserving order.
pub fn filter_packages(all: Vec<Package>, selection: &Selection) -> Vec<Package> {
    for name in selection.include.iter().chain(selection.exclude.iter()) {
        if !all.iter().any(|p| p.short_name() == name) {
            warn!(package = %name, "selected package name matches no known package");
        }
    }

    all.into_iter().filter(|p| selection.matches(p)).collect()
}
