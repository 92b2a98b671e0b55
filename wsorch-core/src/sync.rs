//! Keeps workspace dependency ranges in step with member versions.
//!
//! For a package P, every workspace member D listed in P's manifest must be
//! referenced with the caret range of D's current version (`^1.2.0`). Ranges
//! that drifted are rewritten in whichever map (`dependencies` or
//! `devDependencies`) they already live in.
//!
//! # Release ordering
//!
//! The synchronizer only makes manifests agree with the versions that are on
//! disk when it runs. When several packages are released together, every one of
//! them must have its final version written *before* synchronizing any of them.
//! Otherwise a package released early in the batch ends up depending on a
//! version of a later package that does not exist yet. Sequencing releases is
//! the caller's job.

use std::path::{Path, PathBuf};

use semver::Version;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::manifest::{DependencySection, Manifest, ManifestStore, MANIFEST_FILE};
use crate::package::{normalize_path, Package};
use crate::sync_reporter::{SilentReporter, SyncReporter};

/// One rewritten dependency range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionChange {
    /// Package whose manifest was edited.
    pub package: PathBuf,
    /// Workspace member the entry refers to.
    pub member: PathBuf,
    /// Manifest name of the member.
    pub dependency: String,
    /// Map the entry lives in.
    pub section: DependencySection,
    /// Previous range, if the entry existed.
    pub old_range: Option<String>,
    /// Caret range of the member's current version.
    pub new_range: String,
}

/// Rewrites dependency ranges of workspace members.
pub struct VersionSynchronizer {
    store: ManifestStore,
    dry_run: bool,
    reporter: Box<dyn SyncReporter>,
}

impl VersionSynchronizer {
    pub fn new(store: ManifestStore) -> Self {
        Self {
            store,
            dry_run: false,
            reporter: Box::new(SilentReporter),
        }
    }

    /// When set, changes are reported but manifests are left untouched.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_reporter<R: SyncReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// Workspace members of `package`, as paths relative to the workspace root.
    ///
    /// # Errors
    ///
    /// Fails if the package's own manifest cannot be read.
    pub fn dependent_packages(&self, package: &Path) -> Result<Vec<PathBuf>> {
        let manifest = self.store.read(package)?;
        Ok(self.members_of(package, &manifest))
    }

    fn members_of(&self, package: &Path, manifest: &Manifest) -> Vec<PathBuf> {
        let own = normalize_path(package);
        let mut members: Vec<PathBuf> = Vec::new();

        for entry in manifest.workspaces() {
            let candidates = if is_glob(entry) {
                self.expand_glob(&own, entry)
            } else {
                vec![normalize_path(&own.join(entry))]
            };

            for candidate in candidates {
                if candidate != own && !members.contains(&candidate) {
                    members.push(candidate);
                }
            }
        }

        members
    }

    fn expand_glob(&self, package: &Path, entry: &str) -> Vec<PathBuf> {
        let root = self.store.root();
        let Some(base) = root.join(package).to_str().map(glob::Pattern::escape) else {
            warn!(
                package = %package.display(),
                "package path is not valid UTF-8, ignoring glob members"
            );
            return Vec::new();
        };
        let pattern = format!("{}/{}", base.trim_end_matches('/'), entry);

        let paths = match glob::glob(&pattern) {
            Ok(paths) => paths,
            Err(e) => {
                warn!(pattern = entry, error = %e, "invalid workspace glob");
                return Vec::new();
            }
        };

        paths
            .filter_map(|p| p.ok())
            .filter(|p| p.join(MANIFEST_FILE).is_file())
            .filter_map(|p| p.strip_prefix(root).ok().map(normalize_path))
            .collect()
    }

    /// Brings the ranges of `package`'s workspace members up to date.
    ///
    /// Members whose manifest is missing, lacks a version or has an invalid one
    /// are skipped with a warning. The manifest is written only if something
    /// changed.
    ///
    /// # Errors
    ///
    /// Fails if the package's own manifest cannot be read or written.
    pub fn update_dependent_versions(&self, package: &Package) -> Result<Vec<VersionChange>> {
        let mut manifest = self.store.read(&package.path)?;
        let members = self.members_of(&package.path, &manifest);
        let mut changes = Vec::new();

        for member in members {
            debug!(package = %package, member = %member.display(), "considering");
            self.reporter.considering(&package.path, &member);

            let (name, version) = match self.member_version(&member) {
                Ok(found) => found,
                Err(reason) => {
                    warn!(
                        package = %package,
                        member = %member.display(),
                        %reason,
                        "skipping member, package not available"
                    );
                    self.reporter.skipped(&package.path, &member, &reason);
                    continue;
                }
            };

            let required = format!("^{}", version);
            let in_dev = manifest.section_contains_key(DependencySection::DevDependencies, &name);
            let section = if in_dev {
                DependencySection::DevDependencies
            } else {
                DependencySection::Dependencies
            };

            let current = manifest.section(section).get(&name);
            if current == Some(required.as_str()) {
                continue;
            }

            let change = VersionChange {
                package: package.path.clone(),
                member: member.clone(),
                dependency: name.clone(),
                section,
                old_range: current.map(str::to_string),
                new_range: required.clone(),
            };

            info!(
                package = %package,
                dependency = %name,
                section = %section,
                from = change.old_range.as_deref().unwrap_or(""),
                to = %required,
                "dependency range changed"
            );
            self.reporter.changed(&change, self.dry_run);

            manifest.set_dependency(section, &name, &required);
            changes.push(change);
        }

        if !changes.is_empty() && !self.dry_run {
            self.store.write(&manifest)?;
        }

        Ok(changes)
    }

    /// Runs [`update_dependent_versions`](Self::update_dependent_versions) for
    /// every package, in order.
    pub fn update_all_dependent_versions(
        &self,
        packages: &[Package],
    ) -> Result<Vec<VersionChange>> {
        let mut changes = Vec::new();
        for package in packages {
            changes.extend(self.update_dependent_versions(package)?);
        }
        Ok(changes)
    }

    fn member_version(&self, member: &Path) -> std::result::Result<(String, String), String> {
        let manifest = self.store.read(member).map_err(|e| e.to_string())?;
        let version = manifest.version().map_err(|e| e.to_string())?;
        Version::parse(version).map_err(|e| format!("invalid version '{}': {}", version, e))?;
        Ok((manifest.name().to_string(), version.to_string()))
    }
}

fn is_glob(entry: &str) -> bool {
    entry.contains(['*', '?', '['])
}
