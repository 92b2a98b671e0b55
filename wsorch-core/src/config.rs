//! Workspace configuration loaded from `wsorch.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// File name of the workspace configuration.
pub const CONFIG_FILE: &str = "wsorch.toml";

/// Build order used when `wsorch.toml` does not provide one.
///
/// The external build tool resolves most inter-package dependencies on its own,
/// but a few packages read the built output of others directly, so those must
/// come first.
pub const DEFAULT_ORDER: &[&str] = &[
    "packages/",
    // hub serves the cdn assets
    "packages/cdn",
    "packages/util",
    "packages/sync",
    "packages/sync-client",
    "packages/sync-fs",
    "packages/backend",
    "packages/api-client",
    "packages/jupyter",
    "packages/comm",
    "packages/assets",
    // static bundles frontend; frontend reads assets
    "packages/frontend",
    // project imports frontend for nbconvert, never the other way round
    "packages/project",
    // hub runs the webpack dev server out of static
    "packages/static",
    // next imports server and database
    "packages/server",
    "packages/database",
    "packages/next",
    // hub fails to build unless next is built
    "packages/hub",
];

/// Settings for a workspace, all optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory scanned for packages not listed in `order`, relative to the root.
    pub packages_dir: String,
    /// Package manager executable used for every external command.
    pub package_manager: String,
    /// Build output directory inside each package.
    pub output_dir: String,
    /// Explicit build order, relative to the root.
    pub order: Vec<String>,
    /// Worker bound for parallel builds and deletions.
    pub parallel: usize,
    /// Worker bound for parallel script runs (clean, arbitrary commands).
    pub script_parallel: usize,
    /// Packages whose output directory is never deleted before a rebuild.
    pub preserve_output: Vec<String>,
    /// Kill external commands running longer than this many seconds.
    pub command_timeout_secs: Option<u64>,
    /// Path of the file this was loaded from.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            packages_dir: "packages".to_string(),
            package_manager: "pnpm".to_string(),
            output_dir: "dist".to_string(),
            order: DEFAULT_ORDER.iter().map(|s| s.to_string()).collect(),
            parallel: 10,
            script_parallel: 3,
            preserve_output: vec!["packages/static".to_string()],
            command_timeout_secs: None,
            config_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    workspace: WorkspaceConfig,
}

impl WorkspaceConfig {
    /// Parses the contents of a `wsorch.toml` file.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.workspace)
    }

    /// Loads the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content).map_err(|e| match e {
            crate::Error::Toml { error, .. } => crate::Error::Toml {
                error,
                context: path.display().to_string(),
            },
            other => other,
        })?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Walks up from `start` looking for `wsorch.toml`, stopping at the first
    /// directory containing `.git`.
    ///
    /// Returns the workspace root together with its configuration. Without a
    /// config file the root is `start` and the defaults apply.
    pub fn discover(start: impl AsRef<Path>) -> Result<(PathBuf, Self)> {
        let start = start.as_ref().to_path_buf();
        let mut current = start.as_path();

        loop {
            let candidate = current.join(CONFIG_FILE);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok((current.to_path_buf(), config));
            }

            if current.join(".git").exists() {
                break;
            }

            match current.parent() {
                Some(parent) if parent != current => current = parent,
                _ => break,
            }
        }

        Ok((start, Self::default()))
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
