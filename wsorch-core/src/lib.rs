//! Core library for monorepo build orchestration.

pub mod command;
pub mod config;
pub mod error;
pub mod manifest;
pub mod package;
pub mod registry;
pub mod scheduler;
pub mod staleness;
pub mod sync;
pub mod sync_reporter;
pub mod workspace;

pub use command::{shell_quote, CommandOutput, CommandRunner};
pub use config::WorkspaceConfig;
pub use error::{Error, Result};
pub use manifest::{DependencyMap, DependencySection, Manifest, ManifestStore};
pub use package::{Package, Selection};
pub use registry::{filter_packages, PackageRegistry};
pub use scheduler::{map_concurrent, TaskScheduler};
pub use staleness::{StalenessDetector, SUCCESSFUL_BUILD};
pub use sync::{VersionChange, VersionSynchronizer};
pub use sync_reporter::{SilentReporter, SyncReporter};
pub use workspace::{CleanReport, CleanTarget, PackageInfo, TaskResult, Workspace};
