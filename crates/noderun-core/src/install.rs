//! Project dependency installation.
//!
//! When a project has a `package.json`, the exposed runtime enables its
//! bundled package-manager shim and then installs dependencies with the
//! package manager named in the manifest's `packageManager` field.

use std::ffi::OsString;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::Reporter;
use crate::error::{NodeRunError, Result};
use crate::launch::{Invocation, status_to_result};
use crate::paths::ProjectLayout;

/// Package manager used when the manifest does not name a usable one.
pub const FALLBACK_PACKAGE_MANAGER: &str = "npm";

const SHIM_TOOL: &str = "corepack";

/// The `packageManager` identifier from a project manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManagerId {
    /// Tool name, e.g. `pnpm`.
    pub name: String,
    /// Requested version; `None` only for the fallback.
    pub version: Option<String>,
}

impl PackageManagerId {
    /// Parse `name@version`. Both parts must be non-empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let (name, version) = raw.trim().split_once('@')?;
        if name.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            version: Some(version.to_string()),
        })
    }

    /// The fallback package manager.
    pub fn fallback() -> Self {
        Self {
            name: FALLBACK_PACKAGE_MANAGER.to_string(),
            version: None,
        }
    }

    /// Identifier passed to the shim tool (`name@version` or just `name`).
    pub fn identifier(&self) -> String {
        match &self.version {
            Some(version) => format!("{}@{version}", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Deserialize)]
struct PackageManifest {
    #[serde(rename = "packageManager")]
    package_manager: Option<serde_json::Value>,
}

/// Read the package manager named by the manifest at `path`.
///
/// Never fails: an unreadable manifest, or a missing or malformed field,
/// yields [`PackageManagerId::fallback`].
pub fn read_package_manager(path: &Path) -> PackageManagerId {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Could not read {}: {e}", path.display());
            return PackageManagerId::fallback();
        }
    };
    let manifest: PackageManifest = match serde_json::from_str(&content) {
        Ok(manifest) => manifest,
        Err(e) => {
            warn!("Could not parse {}: {e}", path.display());
            return PackageManagerId::fallback();
        }
    };

    match manifest.package_manager {
        Some(serde_json::Value::String(raw)) => PackageManagerId::parse(&raw).unwrap_or_else(|| {
            debug!("Ignoring malformed packageManager {raw:?}");
            PackageManagerId::fallback()
        }),
        Some(other) => {
            debug!("Ignoring non-string packageManager {other}");
            PackageManagerId::fallback()
        }
        None => PackageManagerId::fallback(),
    }
}

/// Runs subprocesses to completion.
pub trait CommandRunner: Send + Sync {
    /// Run `invocation`, inheriting stdio, and wait for it.
    ///
    /// # Errors
    ///
    /// Returns [`NodeRunError::Subprocess`] if the process cannot start,
    /// exits non-zero or is killed by a signal.
    fn run(&self, invocation: &Invocation) -> Result<()>;
}

/// Spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        debug!("Running {invocation}");
        let status = invocation.to_command().status().map_err(|e| {
            NodeRunError::subprocess(invocation.to_string(), format!("failed to start: {e}"))
        })?;
        status_to_result(invocation, status)
    }
}

/// Installs a project's dependencies through the exposed runtime.
pub struct DependencyInstaller<'a> {
    project: &'a ProjectLayout,
    runner: &'a dyn CommandRunner,
    reporter: &'a dyn Reporter,
}

impl std::fmt::Debug for DependencyInstaller<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyInstaller")
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

impl<'a> DependencyInstaller<'a> {
    /// Installer for `project`, running steps through `runner`.
    pub fn new(
        project: &'a ProjectLayout,
        runner: &'a dyn CommandRunner,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            project,
            runner,
            reporter,
        }
    }

    /// Run both install steps if the project has a manifest.
    ///
    /// Returns the package manager used, or `None` when there is no
    /// manifest and nothing ran.
    ///
    /// # Errors
    ///
    /// The first failing step aborts the run with its error.
    pub fn install_if_manifest(&self) -> Result<Option<PackageManagerId>> {
        let manifest = self.project.manifest_path();
        if !manifest.is_file() {
            debug!("No manifest at {}, skipping install", manifest.display());
            return Ok(None);
        }

        self.reporter.section("Installing dependencies");
        self.runner.run(&self.shim_invocation(["enable"])?)?;

        let package_manager = read_package_manager(&manifest);
        self.reporter
            .info(&format!("Using {}", package_manager.identifier()));
        self.runner
            .run(&self.shim_invocation([package_manager.identifier(), "install".to_string()])?)?;

        self.reporter.success("Dependencies installed");
        Ok(Some(package_manager))
    }

    /// `<.node>/bin/node <.node>/bin/corepack <args...>`
    fn shim_invocation<I, S>(&self, args: I) -> Result<Invocation>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let shim = self.project.bin_dir().join(SHIM_TOOL);
        let args = std::iter::once(shim.into_os_string()).chain(args.into_iter().map(Into::into));
        Invocation::runtime(self.project, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use std::sync::Mutex;

    /// Records invocations; the `fail_at`th call (0-based) exits 1.
    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<Invocation>>,
        fail_at: Option<usize>,
    }

    impl RecordingRunner {
        fn failing_at(n: usize) -> Self {
            Self {
                calls: Mutex::default(),
                fail_at: Some(n),
            }
        }

        fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, invocation: &Invocation) -> Result<()> {
            let index = match self.calls.lock() {
                Ok(mut calls) => {
                    calls.push(invocation.clone());
                    calls.len() - 1
                }
                Err(_) => return Err(NodeRunError::subprocess(invocation.to_string(), "runner poisoned")),
            };
            if self.fail_at == Some(index) {
                return Err(NodeRunError::subprocess(invocation.to_string(), "exited with status 1"));
            }
            Ok(())
        }
    }

    fn project_with_manifest(content: Option<&str>) -> (tempfile::TempDir, ProjectLayout) {
        let tmp = tempfile::tempdir().unwrap();
        let project = ProjectLayout::new(tmp.path());
        if let Some(content) = content {
            std::fs::write(project.manifest_path(), content).unwrap();
        }
        (tmp, project)
    }

    fn args_of(inv: &Invocation) -> Vec<String> {
        inv.args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_parse_package_manager() {
        assert_eq!(
            PackageManagerId::parse("pnpm@8.15.0").unwrap().identifier(),
            "pnpm@8.15.0"
        );
        assert!(PackageManagerId::parse("yarn@").is_none());
        assert!(PackageManagerId::parse("@1.0.0").is_none());
        assert!(PackageManagerId::parse("yarn").is_none());
        assert_eq!(PackageManagerId::fallback().identifier(), "npm");
    }

    #[test]
    fn test_read_package_manager_fallbacks() {
        let cases = [
            (r#"{"packageManager": "yarn@4.1.0"}"#, "yarn@4.1.0"),
            (r#"{"name": "app"}"#, "npm"),
            (r#"{"packageManager": 7}"#, "npm"),
            (r#"{"packageManager": "pnpm"}"#, "npm"),
            ("not json", "npm"),
        ];
        for (content, expected) in cases {
            let (_tmp, project) = project_with_manifest(Some(content));
            assert_eq!(
                read_package_manager(&project.manifest_path()).identifier(),
                expected,
                "{content}"
            );
        }

        let (_tmp, project) = project_with_manifest(None);
        assert_eq!(read_package_manager(&project.manifest_path()), PackageManagerId::fallback());
    }

    #[test]
    fn test_no_manifest_runs_nothing() {
        let (_tmp, project) = project_with_manifest(None);
        let runner = RecordingRunner::default();

        let used = DependencyInstaller::new(&project, &runner, &NullReporter)
            .install_if_manifest()
            .unwrap();

        assert_eq!(used, None);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_runs_enable_then_install() {
        let (_tmp, project) = project_with_manifest(Some(r#"{"packageManager": "pnpm@9.0.0"}"#));
        let runner = RecordingRunner::default();

        let used = DependencyInstaller::new(&project, &runner, &NullReporter)
            .install_if_manifest()
            .unwrap();

        let calls = runner.calls();
        let shim = project.bin_dir().join("corepack").to_string_lossy().into_owned();
        assert_eq!(used.map(|p| p.identifier()).as_deref(), Some("pnpm@9.0.0"));
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].program, project.binary_path());
        assert_eq!(args_of(&calls[0]), [shim.as_str(), "enable"]);
        assert_eq!(args_of(&calls[1]), [shim.as_str(), "pnpm@9.0.0", "install"]);
        for call in &calls {
            assert_eq!(call.cwd, project.root());
            assert!(call.path.to_string_lossy().starts_with(&*project.bin_dir().to_string_lossy()));
        }
    }

    #[test]
    fn test_failed_enable_stops_installation() {
        let (_tmp, project) = project_with_manifest(Some("{}"));
        let runner = RecordingRunner::failing_at(0);

        let err = DependencyInstaller::new(&project, &runner, &NullReporter)
            .install_if_manifest()
            .unwrap_err();

        assert!(matches!(err, NodeRunError::Subprocess { .. }));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_failed_install_is_fatal() {
        let (_tmp, project) = project_with_manifest(Some("{}"));
        let runner = RecordingRunner::failing_at(1);

        let err = DependencyInstaller::new(&project, &runner, &NullReporter)
            .install_if_manifest()
            .unwrap_err();

        assert!(err.to_string().contains("npm install"));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_reports_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let inv = Invocation {
            program: "/bin/sh".into(),
            args: vec!["-c".into(), "exit 3".into()],
            cwd: tmp.path().to_path_buf(),
            path: std::env::var_os("PATH").unwrap_or_default(),
        };

        let err = SystemRunner.run(&inv).unwrap_err();
        assert!(err.to_string().contains("exited with status 3"));
        assert!(SystemRunner.run(&Invocation { args: vec!["-c".into(), "true".into()], ..inv }).is_ok());
    }
}
