//! Major version lock storage.
//!
//! The lock is a single integer: the major release line a project settled
//! on the first time it ran without an explicit pin. It is written once and
//! only read afterwards; deleting it is left to the user.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{NodeRunError, Result};

/// Storage seam for the major version lock.
pub trait LockStore {
    /// Read the recorded major version, `None` if no usable lock exists.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage failures other than absence.
    fn read(&self) -> Result<Option<u64>>;

    /// Record `major` as the project's lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be persisted.
    fn write(&mut self, major: u64) -> Result<()>;
}

/// Lock persisted as a plain decimal number in a file.
#[derive(Debug, Clone)]
pub struct FileLockStore {
    path: PathBuf,
}

impl FileLockStore {
    /// Lock stored at `path` (normally `<project>/.node/version.txt`).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LockStore for FileLockStore {
    fn read(&self) -> Result<Option<u64>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(NodeRunError::io(
                    format!("reading lock file {}", self.path.display()),
                    e,
                ));
            }
        };

        if let Ok(major) = content.trim().parse::<u64>() {
            debug!("Cached major version: {major}");
            Ok(Some(major))
        } else {
            warn!(
                "Ignoring unreadable lock file {}: {:?}",
                self.path.display(),
                content.trim()
            );
            Ok(None)
        }
    }

    fn write(&mut self, major: u64) -> Result<()> {
        std::fs::write(&self.path, major.to_string()).map_err(|e| {
            NodeRunError::io(format!("writing lock file {}", self.path.display()), e)
        })?;
        debug!("Locked major version {major} in {}", self.path.display());
        Ok(())
    }
}

/// In-memory lock that counts writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryLockStore {
    value: Option<u64>,
    writes: usize,
}

impl MemoryLockStore {
    /// A lock holding `value`.
    pub fn new(value: Option<u64>) -> Self {
        Self { value, writes: 0 }
    }

    /// Current value.
    pub fn value(&self) -> Option<u64> {
        self.value
    }

    /// Number of `write` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl LockStore for MemoryLockStore {
    fn read(&self) -> Result<Option<u64>> {
        Ok(self.value)
    }

    fn write(&mut self, major: u64) -> Result<()> {
        self.value = Some(major);
        self.writes += 1;
        Ok(())
    }
}
