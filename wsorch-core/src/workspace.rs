//! Workspace-wide operations: install, build, clean, arbitrary commands and
//! version synchronization.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::command::{shell_quote, CommandRunner};
use crate::config::WorkspaceConfig;
use crate::error::{Error, Result};
use crate::manifest::ManifestStore;
use crate::package::{Package, Selection};
use crate::registry::{filter_packages, PackageRegistry};
use crate::scheduler::TaskScheduler;
use crate::staleness::{StalenessDetector, SUCCESSFUL_BUILD};
use crate::sync::{VersionChange, VersionSynchronizer};
use crate::sync_reporter::SyncReporter;

const NODE_MODULES: &str = "node_modules";
const PACKAGE_LOCK: &str = "package-lock.json";

/// Receives streamed command output: package, line, and whether it came from stderr.
pub type OutputHandler = Arc<dyn Fn(&Package, &str, bool) + Send + Sync>;

/// Result of running one external command for a package.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    /// Package the command ran in.
    pub package: Package,
    /// The command line.
    pub command: String,
    /// Whether the command succeeded.
    pub success: bool,
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,
}

/// What `clean` deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanTarget {
    /// `node_modules`, the output directory and the build marker.
    #[default]
    All,
    /// Only the output directory.
    OutputOnly,
    /// Only `node_modules`.
    NodeModulesOnly,
}

/// Outcome of `clean`.
#[derive(Debug, Clone, Default)]
pub struct CleanReport {
    /// Paths that were deleted.
    pub deleted: Vec<PathBuf>,
    /// Clean scripts that were run.
    pub scripts: Vec<TaskResult>,
}

/// Summary of a package for listings.
#[derive(Debug, Clone, Serialize)]
pub struct PackageInfo {
    pub package: Package,
    pub name: Option<String>,
    pub version: Option<String>,
    pub needs_build: bool,
}

/// A monorepo and the operations that run across its packages.
pub struct Workspace {
    root: PathBuf,
    config: WorkspaceConfig,
    registry: PackageRegistry,
    store: ManifestStore,
    detector: StalenessDetector,
    runner: CommandRunner,
    output: OutputHandler,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, config: WorkspaceConfig) -> Self {
        let root = root.into();
        let registry = PackageRegistry::new(&root, &config);
        let store = ManifestStore::new(&root);
        let detector = StalenessDetector::new(config.output_dir.clone());
        let runner = CommandRunner::new().with_timeout(config.command_timeout());
        let output: OutputHandler = Arc::new(|package: &Package, line: &str, is_stderr: bool| {
            debug!(package = %package, stderr = is_stderr, "{}", line);
        });

        Self {
            root,
            config,
            registry,
            store,
            detector,
            runner,
            output,
        }
    }

    /// Locates `wsorch.toml` upward from `start` and opens that workspace.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self> {
        let (root, config) = WorkspaceConfig::discover(start)?;
        Ok(Self::new(root, config))
    }

    pub fn with_output_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Package, &str, bool) + Send + Sync + 'static,
    {
        self.output = Arc::new(handler);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn registry(&self) -> &PackageRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    pub fn detector(&self) -> &StalenessDetector {
        &self.detector
    }

    /// Selected packages, in build order.
    pub fn packages(&self, selection: &Selection) -> Result<Vec<Package>> {
        let packages = self.registry.select(selection)?;
        announce(&packages);
        Ok(packages)
    }

    /// Installs dependencies.
    ///
    /// Selecting every package runs a single install in the packages directory;
    /// otherwise each package is installed in turn.
    pub fn install(&self, selection: &Selection, prod: bool) -> Result<Vec<TaskResult>> {
        let all = self.registry.list_packages()?;
        let selected = filter_packages(all.clone(), selection);
        let command = if prod {
            format!("{} install --prod", self.config.package_manager)
        } else {
            format!("{} install", self.config.package_manager)
        };

        if selected == all {
            info!("installing all packages at once");
            let top = Package::new(&self.config.packages_dir);
            return Ok(vec![self.run_streamed(&top, &command, false)?]);
        }

        announce(&selected);
        TaskScheduler::sequential().map(&selected, |p| self.run_streamed(p, &command, false))
    }

    /// Builds every selected package whose build is stale.
    ///
    /// Sequential builds delete the output directory first (except for packages
    /// in `preserve_output`); parallel builds never delete it, since another
    /// package's build may be reading it. The build marker is written only
    /// after the build command succeeds.
    pub fn build(
        &self,
        selection: &Selection,
        dev: bool,
        parallel: bool,
    ) -> Result<Vec<TaskResult>> {
        let stale: Vec<Package> = self
            .packages(selection)?
            .into_iter()
            .filter(|p| self.detector.needs_build(&p.dir(&self.root)))
            .collect();

        if stale.is_empty() {
            info!("nothing to build");
            return Ok(Vec::new());
        }

        let workers = if parallel { self.config.parallel } else { 1 };
        TaskScheduler::new(workers).map(&stale, |p| self.build_one(p, dev, parallel))
    }

    fn build_one(&self, package: &Package, dev: bool, parallel: bool) -> Result<TaskResult> {
        let dir = package.dir(&self.root);

        if !parallel && !self.preserves_output(package) {
            let output_dir = self.detector.output_path(&dir);
            if output_dir.exists() {
                remove_path(&output_dir);
            }
        }

        let script = if dev && self.store.read(&package.path)?.has_script("build-dev") {
            "build-dev"
        } else {
            "build"
        };
        let command = format!("{} run {}", self.config.package_manager, script);
        let result = self.run_streamed(package, &command, false)?;

        self.detector
            .mark_built(&dir)
            .map_err(|e| Error::CommandExecution {
                command: command.clone(),
                path: dir.clone(),
                message: format!("build succeeded but writing {} failed: {}", SUCCESSFUL_BUILD, e),
            })?;

        Ok(result)
    }

    fn preserves_output(&self, package: &Package) -> bool {
        self.config
            .preserve_output
            .iter()
            .any(|p| Path::new(p) == package.path)
    }

    /// Deletes build artifacts and runs each package's clean script.
    pub fn clean(
        &self,
        selection: &Selection,
        target: CleanTarget,
        parallel: bool,
    ) -> Result<CleanReport> {
        let selected = self.packages(selection)?;

        let folders: Vec<&str> = match target {
            CleanTarget::OutputOnly => vec![self.config.output_dir.as_str()],
            CleanTarget::NodeModulesOnly => vec![NODE_MODULES],
            CleanTarget::All => vec![
                NODE_MODULES,
                self.config.output_dir.as_str(),
                SUCCESSFUL_BUILD,
            ],
        };

        let mut paths: Vec<PathBuf> = Vec::new();
        for package in &selected {
            for folder in &folders {
                let path = package.dir(&self.root).join(folder);
                if path.exists() && !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }

        let mut report = CleanReport::default();

        if paths.is_empty() {
            info!("no node_modules or dist directories");
        } else {
            let top_modules = self.root.join(&self.config.packages_dir).join(NODE_MODULES);
            if !paths.iter().any(|p| p == &top_modules) {
                paths.push(top_modules);
            }
            info!(
                "deleting {}",
                paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            let removed =
                TaskScheduler::new(self.config.parallel).map(&paths, |p| Ok(remove_path(p)))?;
            report.deleted = paths
                .into_iter()
                .zip(removed)
                .filter_map(|(p, ok)| ok.then_some(p))
                .collect();
        }

        if target != CleanTarget::NodeModulesOnly {
            info!("running the clean script where present");
            let command = format!("{} run clean --if-present", self.config.package_manager);
            let workers = if parallel { self.config.script_parallel } else { 1 };
            report.scripts = TaskScheduler::new(workers)
                .map(&selected, |p| self.run_streamed(p, &command, false))?;
        }

        Ok(report)
    }

    /// Runs `<package manager> <args>` in every selected package.
    ///
    /// Each argument is quoted for the shell and passed through unchanged. The
    /// configured package manager is used as written. With `tolerant`, failing
    /// commands are logged and reported in the results instead of stopping the
    /// run.
    pub fn run_arbitrary(
        &self,
        selection: &Selection,
        args: &[String],
        tolerant: bool,
        parallel: bool,
    ) -> Result<Vec<TaskResult>> {
        let selected = self.packages(selection)?;
        let command = std::iter::once(Cow::Borrowed(self.config.package_manager.as_str()))
            .chain(args.iter().map(|arg| shell_quote(arg)))
            .collect::<Vec<_>>()
            .join(" ");
        let workers = if parallel { self.config.script_parallel } else { 1 };
        TaskScheduler::new(workers).map(&selected, |p| self.run_streamed(p, &command, tolerant))
    }

    /// Synchronizes workspace dependency ranges across every known package.
    ///
    /// Package versions being released together must already be final on disk;
    /// see [`crate::sync`].
    pub fn sync_versions<R>(&self, dry_run: bool, reporter: R) -> Result<Vec<VersionChange>>
    where
        R: SyncReporter + 'static,
    {
        let packages = self.registry.list_packages()?;
        VersionSynchronizer::new(self.store.clone())
            .with_dry_run(dry_run)
            .with_reporter(reporter)
            .update_all_dependent_versions(&packages)
    }

    /// Removes `package-lock.json` and `node_modules` from every selected package.
    pub fn delete_package_lock(&self, selection: &Selection) -> Result<Vec<PathBuf>> {
        let selected = self.packages(selection)?;
        let removed = TaskScheduler::new(self.config.parallel).map(&selected, |p| {
            let dir = p.dir(&self.root);
            let mut removed = Vec::new();
            for name in [PACKAGE_LOCK, NODE_MODULES] {
                let path = dir.join(name);
                if path.exists() && remove_path(&path) {
                    removed.push(path);
                }
            }
            Ok(removed)
        })?;
        Ok(removed.into_iter().flatten().collect())
    }

    /// Name, version and build state of each selected package.
    pub fn describe(&self, selection: &Selection) -> Result<Vec<PackageInfo>> {
        let selected = self.registry.select(selection)?;
        Ok(selected
            .into_iter()
            .map(|package| {
                let manifest = self.store.read(&package.path).ok();
                let needs_build = self.detector.needs_build(&package.dir(&self.root));
                PackageInfo {
                    name: manifest.as_ref().map(|m| m.name().to_string()),
                    version: manifest.as_ref().and_then(|m| m.version_opt().map(str::to_string)),
                    needs_build,
                    package,
                }
            })
            .collect())
    }

    fn run_streamed(&self, package: &Package, command: &str, tolerant: bool) -> Result<TaskResult> {
        let output = self.runner.exec_and_stream(
            command,
            &package.dir(&self.root),
            tolerant,
            |line, is_stderr| (self.output)(package, line, is_stderr),
        )?;
        Ok(TaskResult {
            package: package.clone(),
            command: output.command,
            success: output.success,
            exit_code: output.exit_code,
        })
    }
}

fn announce(packages: &[Package]) {
    info!(
        "Packages: {}",
        packages
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
}

/// Deletes a file or directory tree, logging instead of failing.
fn remove_path(path: &Path) -> bool {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => {
            info!(path = %path.display(), "removed");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove");
            false
        }
    }
}
