//! Invocation settings, resolved once from the environment.

use std::path::PathBuf;

use noderun_schema::Platform;

use crate::error::{NodeRunError, Result};
use crate::paths::{ProjectLayout, StoreLayout, try_noderun_home};

/// Environment variable overriding the distribution host.
pub const DIST_URL_ENV: &str = "NODERUN_DIST_URL";

/// Default distribution host.
pub const DEFAULT_DIST_URL: &str = "https://nodejs.org/dist";

/// Everything an invocation needs to know about where things live.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Shared store root.
    pub store_root: PathBuf,
    /// Base URL of the distribution host, without a trailing slash.
    pub dist_url: String,
    /// Project root (the working directory).
    pub project_root: PathBuf,
    /// Platform archives are fetched for.
    pub platform: Platform,
}

impl Settings {
    /// Load settings from `NODERUN_HOME`, `NODERUN_DIST_URL` and the
    /// current working directory.
    ///
    /// # Errors
    ///
    /// Fails if neither `NODERUN_HOME` nor the home directory is available,
    /// or the working directory cannot be read.
    pub fn from_env() -> Result<Self> {
        let store_root = try_noderun_home().ok_or_else(|| {
            NodeRunError::io(
                "locating the store root",
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "home directory not found; set NODERUN_HOME",
                ),
            )
        })?;

        let dist_url = std::env::var(DIST_URL_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DIST_URL.to_string());

        let project_root = std::env::current_dir()
            .map_err(|e| NodeRunError::io("reading the current directory", e))?;

        Ok(Self::new(store_root, dist_url, project_root))
    }

    /// Settings for the current platform with explicit locations.
    pub fn new(
        store_root: impl Into<PathBuf>,
        dist_url: impl Into<String>,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store_root: store_root.into(),
            dist_url: dist_url.into().trim_end_matches('/').to_string(),
            project_root: project_root.into(),
            platform: Platform::current(),
        }
    }

    /// `<dist>/index.json`
    pub fn index_url(&self) -> String {
        format!("{}/index.json", self.dist_url)
    }

    /// Shared store for this platform.
    pub fn store(&self) -> StoreLayout {
        StoreLayout::new(&self.store_root, self.platform)
    }

    /// The project being run.
    pub fn project(&self) -> ProjectLayout {
        ProjectLayout::new(&self.project_root)
    }
}
