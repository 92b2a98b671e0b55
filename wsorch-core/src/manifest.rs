//! Reading and writing `package.json` manifests.
//!
//! A [`Manifest`] keeps the parsed document with its original key order next to
//! a typed view of the fields this crate cares about. Edits go through
//! [`Manifest::set_dependency`], which updates both, so writing a manifest back
//! never reorders or drops keys it does not understand.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Error, Result};

pub const MANIFEST_FILE: &str = "package.json";

/// Dependency name to version range, with entries in manifest order.
///
/// Entries whose range is not a string are dropped with a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyMap(IndexMap<String, String>);

impl DependencyMap {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for DependencyMap {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: IndexMap<String, Value> = IndexMap::deserialize(deserializer)?;
        let mut entries = IndexMap::with_capacity(raw.len());
        for (name, value) in raw {
            match value {
                Value::String(range) => {
                    entries.insert(name, range);
                }
                other => {
                    warn!(
                        dependency = %name,
                        value = %other,
                        "ignoring dependency with a non-string version range"
                    );
                }
            }
        }
        Ok(Self(entries))
    }
}

/// Which dependency map of a manifest an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencySection {
    Dependencies,
    DevDependencies,
}

impl DependencySection {
    #[inline]
    pub fn key(&self) -> &'static str {
        match self {
            DependencySection::Dependencies => "dependencies",
            DependencySection::DevDependencies => "devDependencies",
        }
    }
}

impl fmt::Display for DependencySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WorkspaceMembers {
    List(Vec<String>),
    Object {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl Default for WorkspaceMembers {
    fn default() -> Self {
        WorkspaceMembers::List(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct ManifestFields {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dependencies: DependencyMap,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: DependencyMap,
    #[serde(default)]
    workspaces: WorkspaceMembers,
    #[serde(default)]
    scripts: IndexMap<String, Value>,
}

/// A parsed package manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    document: Map<String, Value>,
    name: String,
    version: Option<String>,
    dependencies: DependencyMap,
    dev_dependencies: DependencyMap,
    workspaces: Vec<String>,
    scripts: Vec<String>,
}

impl Manifest {
    /// Parses manifest `content`; `path` is the file it came from and is used in errors.
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();
        let value: Value = serde_json::from_str(content).map_err(|e| Error::ManifestRead {
            path: path.clone(),
            message: format!("invalid JSON: {}", e),
        })?;

        let fields = ManifestFields::deserialize(&value).map_err(|e| Error::ManifestRead {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let document = match value {
            Value::Object(map) => map,
            _ => {
                return Err(Error::ManifestRead {
                    path,
                    message: "manifest is not a JSON object".to_string(),
                })
            }
        };

        let workspaces = match fields.workspaces {
            WorkspaceMembers::List(v) => v,
            WorkspaceMembers::Object { packages } => packages,
        };

        Ok(Self {
            path,
            document,
            name: fields.name,
            version: fields.version,
            dependencies: fields.dependencies,
            dev_dependencies: fields.dev_dependencies,
            workspaces,
            scripts: fields.scripts.into_keys().collect(),
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The manifest's version, failing with [`Error::ManifestRead`] when absent.
    pub fn version(&self) -> Result<&str> {
        self.version.as_deref().ok_or_else(|| Error::ManifestRead {
            path: self.path.clone(),
            message: "missing \"version\" field".to_string(),
        })
    }

    pub fn version_opt(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn dependencies(&self) -> &DependencyMap {
        &self.dependencies
    }

    pub fn dev_dependencies(&self) -> &DependencyMap {
        &self.dev_dependencies
    }

    pub fn section(&self, section: DependencySection) -> &DependencyMap {
        match section {
            DependencySection::Dependencies => &self.dependencies,
            DependencySection::DevDependencies => &self.dev_dependencies,
        }
    }

    /// Whether `section` has an entry for `name`, whatever its value.
    ///
    /// Unlike [`section`](Self::section), this also sees entries whose value
    /// is not a version string.
    pub fn section_contains_key(&self, section: DependencySection, name: &str) -> bool {
        self.document
            .get(section.key())
            .and_then(Value::as_object)
            .is_some_and(|map| map.contains_key(name))
    }

    /// Workspace member entries exactly as written (relative paths or globs).
    pub fn workspaces(&self) -> &[String] {
        &self.workspaces
    }

    pub fn has_script(&self, name: &str) -> bool {
        self.scripts.iter().any(|s| s == name)
    }

    /// Sets `name` to `range` in `section`, creating the section if needed.
    ///
    /// Returns the previous range, if any.
    pub fn set_dependency(
        &mut self,
        section: DependencySection,
        name: &str,
        range: &str,
    ) -> Option<String> {
        let entry = self
            .document
            .entry(section.key())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = entry {
            map.insert(name.to_string(), Value::String(range.to_string()));
        }

        let typed = match section {
            DependencySection::Dependencies => &mut self.dependencies,
            DependencySection::DevDependencies => &mut self.dev_dependencies,
        };
        typed.0.insert(name.to_string(), range.to_string())
    }

    /// Serializes with 2-space indentation and a trailing newline.
    pub fn to_json_string(&self) -> Result<String> {
        let mut out =
            serde_json::to_string_pretty(&self.document).map_err(|source| Error::Json {
                path: self.path.clone(),
                source,
            })?;
        out.push('\n');
        Ok(out)
    }
}

/// Disk access for package manifests under a workspace root.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    root: PathBuf,
}

impl ManifestStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the manifest for the package at `package` (relative to the root, or absolute).
    pub fn manifest_path(&self, package: &Path) -> PathBuf {
        self.root.join(package).join(MANIFEST_FILE)
    }

    pub fn exists(&self, package: &Path) -> bool {
        self.manifest_path(package).is_file()
    }

    /// Reads the manifest fresh from disk.
    pub fn read(&self, package: &Path) -> Result<Manifest> {
        let path = self.manifest_path(package);
        let content = fs::read_to_string(&path).map_err(|e| Error::ManifestRead {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Manifest::parse(path, &content)
    }

    pub fn write(&self, manifest: &Manifest) -> Result<()> {
        let content = manifest.to_json_string()?;
        fs::write(manifest.path(), content)?;
        Ok(())
    }
}
