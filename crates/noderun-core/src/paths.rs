//! Store and project directory layouts.

use std::path::{Path, PathBuf};

use dirs::home_dir;
use noderun_schema::{Platform, RUNTIME_BINARY};

use crate::error::{NodeRunError, Result};

/// Environment variable overriding the shared store root.
pub const HOME_ENV: &str = "NODERUN_HOME";

/// Name of the project-local exposure directory.
pub const EXPOSURE_DIR_NAME: &str = ".node";

/// Name of the major version lock file inside the exposure directory.
pub const LOCK_FILE_NAME: &str = "version.txt";

/// Name of the project manifest consulted by the dependency installer.
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Returns the shared store root, or None if the user's home cannot be resolved.
pub fn try_noderun_home() -> Option<PathBuf> {
    if let Some(val) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".local").join("share").join("run-node"))
}

/// The shared, cross-project cache.
///
/// Keys are per-version, so projects pinned to different releases share
/// it without conflict. Nothing here is ever evicted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
    platform: Platform,
}

impl StoreLayout {
    /// Store rooted at `root` for the given platform.
    pub fn new(root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            root: root.into(),
            platform,
        }
    }

    /// Store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Platform whose archives this store holds.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// `<root>/archives`
    pub fn archives_dir(&self) -> PathBuf {
        self.root.join("archives")
    }

    /// `<root>/versions`
    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    /// Cached archive for `version`.
    pub fn archive_path(&self, version: &str) -> PathBuf {
        self.archives_dir()
            .join(self.platform.archive_filename(version))
    }

    /// Extracted tree for `version`.
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.versions_dir().join(version)
    }

    /// Runtime binary inside the extracted tree; its presence marks the
    /// extraction as complete.
    pub fn binary_path(&self, version: &str) -> PathBuf {
        self.version_dir(version).join("bin").join(RUNTIME_BINARY)
    }

    /// Create `archives/` and `versions/` if missing.
    ///
    /// # Errors
    ///
    /// Returns [`NodeRunError::Io`] if a directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.archives_dir(), self.versions_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                NodeRunError::io(format!("creating store directory {}", dir.display()), e)
            })?;
        }
        Ok(())
    }
}

/// Paths owned by one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Project rooted at `root` (normally the working directory).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<project>/.node`
    pub fn exposure_dir(&self) -> PathBuf {
        self.root.join(EXPOSURE_DIR_NAME)
    }

    /// `<project>/.node/bin`
    pub fn bin_dir(&self) -> PathBuf {
        self.exposure_dir().join("bin")
    }

    /// `<project>/.node/version.txt`
    pub fn lock_path(&self) -> PathBuf {
        self.exposure_dir().join(LOCK_FILE_NAME)
    }

    /// `<project>/.node/bin/node`
    pub fn binary_path(&self) -> PathBuf {
        self.bin_dir().join(RUNTIME_BINARY)
    }

    /// `<project>/package.json`
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }

    /// Create the exposure directory if missing.
    ///
    /// # Errors
    ///
    /// Returns [`NodeRunError::Io`] if the directory cannot be created.
    pub fn ensure_exposure_dir(&self) -> Result<()> {
        let dir = self.exposure_dir();
        std::fs::create_dir_all(&dir).map_err(|e| {
            NodeRunError::io(format!("creating exposure directory {}", dir.display()), e)
        })
    }
}
