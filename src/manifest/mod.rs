//! Manifest and lockfile model
//!
//! `jsonnetfile.json` declares dependencies with unresolved version refs;
//! `jsonnetfile.lock.json` has the same shape but every version is the
//! concrete revision that was fetched. Both keep dependencies in declaration
//! order.

pub mod file;

use serde::{Deserialize, Serialize};

/// Manifest file name, relative to the project root
pub const MANIFEST_FILE: &str = "jsonnetfile.json";

/// Lockfile name, always a sibling of the manifest
pub const LOCK_FILE: &str = "jsonnetfile.lock.json";

/// Version used when a source string or manifest entry pins nothing
pub const DEFAULT_VERSION: &str = "master";

/// Where a package comes from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Git(GitSource),
}

/// A package living in a git repository, optionally below a subdirectory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GitSource {
    /// Fetchable remote (`git@host:org/repo` or `https://github.com/user/repo`)
    pub remote: String,
    /// Repository-relative path to the package root, empty for the repo root
    #[serde(default)]
    pub subdir: String,
}

impl Source {
    pub fn git(remote: impl Into<String>, subdir: impl Into<String>) -> Self {
        Source::Git(GitSource {
            remote: remote.into(),
            subdir: subdir.into(),
        })
    }

    pub fn remote(&self) -> &str {
        match self {
            Source::Git(git) => &git.remote,
        }
    }

    pub fn subdir(&self) -> &str {
        match self {
            Source::Git(git) => &git.subdir,
        }
    }
}

/// A subdir is clean when it is empty or a relative path made only of
/// normal segments: no empty, `.` or `..` segments and no backslashes.
pub fn is_clean_subdir(subdir: &str) -> bool {
    subdir.is_empty()
        || subdir
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != ".." && !seg.contains('\\'))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Dependency {
    /// Logical package name, also the directory name under the vendor dir
    pub name: String,
    pub source: Source,
    /// Branch or tag in a manifest, concrete revision in a lockfile
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

impl Dependency {
    pub fn new(name: impl Into<String>, source: Source, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source,
            version: version.into(),
        }
    }
}

/// On-disk shape shared by the manifest and the lockfile
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct JsonnetFile {
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

/// User-authored dependency declarations
pub type Manifest = JsonnetFile;

/// Mechanically produced, fully resolved dependency set
pub type Lock = JsonnetFile;

impl JsonnetFile {
    pub fn new(dependencies: Vec<Dependency>) -> Self {
        Self { dependencies }
    }

    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| d.name == name)
    }

    /// Replace the entry with the same name in place, or append it.
    ///
    /// Returns true if an existing entry was replaced.
    pub fn upsert(&mut self, dependency: Dependency) -> bool {
        match self
            .dependencies
            .iter()
            .position(|d| d.name == dependency.name)
        {
            Some(pos) => {
                self.dependencies[pos] = dependency;
                true
            }
            None => {
                self.dependencies.push(dependency);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Check the structural invariants a loaded file must satisfy.
    ///
    /// Returns a description of the first offending entry.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (index, dep) in self.dependencies.iter().enumerate() {
            if dep.name.trim().is_empty() {
                return Err(format!("dependency #{} has an empty name", index + 1));
            }
            // The name is the directory under the vendor dir
            if dep.name.contains(['/', '\\']) || dep.name == "." || dep.name == ".." {
                return Err(format!(
                    "dependency '{}' is not a valid directory name",
                    dep.name
                ));
            }
            if dep.source.remote().trim().is_empty() {
                return Err(format!("dependency '{}' has an empty remote", dep.name));
            }
            if dep.source.remote().starts_with('-') {
                return Err(format!(
                    "dependency '{}' has a remote starting with '-'",
                    dep.name
                ));
            }
            if dep.source.subdir().starts_with('/') {
                return Err(format!(
                    "dependency '{}' has an absolute subdir '{}'",
                    dep.name,
                    dep.source.subdir()
                ));
            }
            if !is_clean_subdir(dep.source.subdir()) {
                return Err(format!(
                    "dependency '{}' has a subdir '{}' with empty, '.' or '..' segments",
                    dep.name,
                    dep.source.subdir()
                ));
            }
            if dep.version.trim().is_empty() || dep.version.starts_with('-') {
                return Err(format!(
                    "dependency '{}' has an invalid version '{}'",
                    dep.name, dep.version
                ));
            }
        }
        Ok(())
    }
}
