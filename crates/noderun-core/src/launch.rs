//! Subprocess plumbing and the final hand-over to the runtime.
//!
//! Every process run-node starts (installer steps and the runtime itself)
//! is described by an [`Invocation`]: program, arguments, working
//! directory and a `PATH` with the project's `.node/bin` in front.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tracing::debug;

use crate::error::{NodeRunError, Result};
use crate::paths::ProjectLayout;

/// A fully described subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments after the program.
    pub args: Vec<OsString>,
    /// Working directory.
    pub cwd: PathBuf,
    /// Value of `PATH` for the child.
    pub path: OsString,
}

impl Invocation {
    /// Invocation of the exposed runtime binary with `args`, run from the
    /// project root.
    ///
    /// # Errors
    ///
    /// Fails if the `PATH` value cannot be assembled.
    pub fn runtime<I, S>(project: &ProjectLayout, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Ok(Self {
            program: project.binary_path(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: project.root().to_path_buf(),
            path: prefixed_path(&project.bin_dir())?,
        })
    }

    /// Build the [`Command`] for this invocation. Stdio is inherited.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.cwd)
            .env("PATH", &self.path);
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// `bin_dir` followed by the entries of the current `PATH`.
///
/// # Errors
///
/// Fails if `bin_dir` contains the platform's path separator.
pub fn prefixed_path(bin_dir: &Path) -> Result<OsString> {
    let current = std::env::var_os("PATH").unwrap_or_default();
    join_path_entries(bin_dir, &current)
}

fn join_path_entries(bin_dir: &Path, rest: &OsStr) -> Result<OsString> {
    let entries = std::iter::once(bin_dir.to_path_buf()).chain(std::env::split_paths(rest));
    std::env::join_paths(entries).map_err(|e| {
        NodeRunError::io(
            format!("adding {} to PATH", bin_dir.display()),
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        )
    })
}

/// Map a finished child's status to success or a [`NodeRunError::Subprocess`].
///
/// # Errors
///
/// Returns an error for a non-zero exit or a signal termination.
pub fn status_to_result(invocation: &Invocation, status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }

    let described = match status.code() {
        Some(code) => format!("exited with status {code}"),
        None => describe_signal(status),
    };
    Err(NodeRunError::subprocess(invocation.to_string(), described))
}

#[cfg(unix)]
fn describe_signal(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => format!("was terminated by signal {signal}"),
        None => "terminated abnormally".to_string(),
    }
}

#[cfg(not(unix))]
fn describe_signal(_status: ExitStatus) -> String {
    "terminated abnormally".to_string()
}

/// Replace the current process with `invocation`.
///
/// Only returns if the replacement failed; the returned error describes why.
#[cfg(unix)]
pub fn exec(invocation: &Invocation) -> NodeRunError {
    use std::os::unix::process::CommandExt;

    debug!("Handing over to {invocation}");
    let err = invocation.to_command().exec();
    NodeRunError::subprocess(invocation.to_string(), format!("could not be executed: {err}"))
}

/// Run `invocation` to completion and exit with its status.
///
/// Platforms without `exec` get the closest equivalent.
#[cfg(not(unix))]
pub fn exec(invocation: &Invocation) -> NodeRunError {
    debug!("Running {invocation}");
    match invocation.to_command().status() {
        Ok(status) => std::process::exit(status.code().unwrap_or(1)),
        Err(err) => {
            NodeRunError::subprocess(invocation.to_string(), format!("could not be executed: {err}"))
        }
    }
}
