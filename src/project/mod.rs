pub mod user_config;

use crate::error::{Error, Result};
use crate::manifest::file::{load, lock_path_for, save};
use crate::manifest::{Manifest, MANIFEST_FILE};
use std::path::{Path, PathBuf};

/// A jsonnet project: the directory holding `jsonnetfile.json`.
#[derive(Debug, Clone)]
pub struct Project {
    /// Path to the project root directory
    pub root: PathBuf,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project rooted at the current working directory
    pub fn current() -> Result<Project> {
        let root = std::env::current_dir().map_err(Error::WorkingDir)?;
        Ok(Project { root })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        lock_path_for(&self.manifest_path())
    }

    pub fn has_manifest(&self) -> bool {
        self.manifest_path().exists()
    }

    pub fn load_manifest(&self) -> Result<Manifest> {
        load(&self.manifest_path())
    }

    pub fn save_manifest(&self, manifest: &Manifest) -> Result<()> {
        save(&self.manifest_path(), manifest)
    }

    /// Write an empty manifest.
    ///
    /// Refuses to replace an existing manifest unless `force` is set.
    pub fn init(&self, force: bool) -> Result<PathBuf> {
        let path = self.manifest_path();
        if !force && path.exists() {
            return Err(Error::AlreadyInitialized { path });
        }
        self.save_manifest(&Manifest::default())?;
        Ok(path)
    }

    /// Resolve a vendor directory relative to the project root
    pub fn vendor_dir(&self, home: &Path) -> PathBuf {
        if home.is_absolute() {
            home.to_path_buf()
        } else {
            self.root.join(home)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Dependency, Source, LOCK_FILE};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_paths() {
        let project = Project::new("/work/monitoring");
        assert_eq!(
            project.manifest_path(),
            PathBuf::from("/work/monitoring/jsonnetfile.json")
        );
        assert_eq!(
            project.lock_path(),
            PathBuf::from("/work/monitoring").join(LOCK_FILE)
        );
    }

    #[test]
    fn test_init_creates_empty_manifest() {
        let temp = TempDir::new().unwrap();
        let project = Project::new(temp.path());

        let path = project.init(false).unwrap();

        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "{\n    \"dependencies\": []\n}\n"
        );
        assert!(!project.lock_path().exists());
    }

    #[test]
    fn test_init_refuses_existing_manifest() {
        let temp = TempDir::new().unwrap();
        let project = Project::new(temp.path());
        let manifest = Manifest::new(vec![Dependency::new(
            "a",
            Source::git("https://github.com/example/a", ""),
            "master",
        )]);
        project.save_manifest(&manifest).unwrap();

        assert!(matches!(
            project.init(false),
            Err(Error::AlreadyInitialized { .. })
        ));
        assert_eq!(project.load_manifest().unwrap(), manifest);

        project.init(true).unwrap();
        assert!(project.load_manifest().unwrap().is_empty());
    }

    #[test]
    fn test_vendor_dir() {
        let project = Project::new("/work/monitoring");
        assert_eq!(
            project.vendor_dir(Path::new("vendor")),
            PathBuf::from("/work/monitoring/vendor")
        );
        assert_eq!(
            project.vendor_dir(Path::new("/opt/jsonnet")),
            PathBuf::from("/opt/jsonnet")
        );
    }
}
