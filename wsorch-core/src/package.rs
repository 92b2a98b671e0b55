//! Package identity and selection.

use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A package in the monorepo, identified by its path relative to the workspace root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    pub path: PathBuf,
}

impl Package {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The final path component, used for include/exclude filtering.
    pub fn short_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Absolute (root-joined) directory of this package.
    #[inline]
    pub fn dir(&self, root: &Path) -> PathBuf {
        root.join(&self.path)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Include/exclude sets of short package names. An empty include set selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub include: HashSet<String>,
    pub exclude: HashSet<String>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses comma separated lists such as `"util,server"`; blank items are ignored.
    pub fn from_lists(include: &str, exclude: &str) -> Self {
        fn split(list: &str) -> HashSet<String> {
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        }
        Self {
            include: split(include),
            exclude: split(exclude),
        }
    }

    pub fn matches(&self, package: &Package) -> bool {
        let name = package.short_name();
        (self.include.is_empty() || self.include.contains(name)) && !self.exclude.contains(name)
    }
}

/// Lexically normalizes a path: drops `.` components and folds `..` into its parent.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.file_name().is_some() {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
