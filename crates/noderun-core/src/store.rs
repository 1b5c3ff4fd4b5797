//! Store reconciliation.
//!
//! Brings the shared store and a project's exposure directory in line with
//! one resolved version. Each step checks its own postcondition first and
//! is skipped when it already holds:
//!
//! 1. the archive exists under `archives/` (otherwise it is downloaded),
//! 2. `versions/<version>/bin/node` exists (otherwise the archive is
//!    extracted there),
//! 3. the exposure directory holds the lock file plus one symlink per
//!    top-level entry of `versions/<version>/`, and nothing else.
//!
//! Presence is the only completeness signal. A truncated archive left by a
//! crashed run is treated as complete; a half-extracted tree is retried
//! because its binary check keeps failing.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::Reporter;
use crate::error::{NodeRunError, Result};
use crate::io::download::download_to;
use crate::io::extract::Extractor;
use crate::paths::{LOCK_FILE_NAME, ProjectLayout, StoreLayout};

/// Where release archives come from.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Fetch the archive at `remote_path` (relative to the distribution
    /// base) into `dest`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the archive cannot be fetched.
    async fn fetch(&self, version: &str, remote_path: &str, dest: &Path) -> Result<()>;
}

/// Archives fetched over HTTPS from the distribution host.
#[derive(Clone)]
pub struct HttpArchiveSource {
    client: Client,
    dist_url: String,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for HttpArchiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpArchiveSource")
            .field("dist_url", &self.dist_url)
            .finish_non_exhaustive()
    }
}

impl HttpArchiveSource {
    /// Source rooted at `dist_url`, reporting download progress to `reporter`.
    pub fn new(client: Client, dist_url: impl Into<String>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            client,
            dist_url: dist_url.into().trim_end_matches('/').to_string(),
            reporter,
        }
    }
}

#[async_trait]
impl ArchiveSource for HttpArchiveSource {
    async fn fetch(&self, version: &str, remote_path: &str, dest: &Path) -> Result<()> {
        let url = format!("{}/{remote_path}", self.dist_url);
        info!("Downloading {url}");
        let bytes = download_to(&self.client, &url, dest, version, &*self.reporter).await?;
        debug!("Downloaded {bytes} bytes to {}", dest.display());
        Ok(())
    }
}

/// What a reconciliation pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Runtime binary inside the exposure directory.
    pub binary: PathBuf,
    /// Whether the archive had to be downloaded.
    pub downloaded: bool,
    /// Whether the archive had to be extracted.
    pub extracted: bool,
    /// Number of symlinks created in the exposure directory.
    pub linked: usize,
}

/// Reconciles the shared store and a project's exposure directory.
pub struct StoreReconciler<'a> {
    store: &'a StoreLayout,
    source: &'a dyn ArchiveSource,
    extractor: &'a dyn Extractor,
    reporter: &'a dyn Reporter,
}

impl std::fmt::Debug for StoreReconciler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreReconciler")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<'a> StoreReconciler<'a> {
    /// Reconciler over `store`, fetching with `source` and unpacking with
    /// `extractor`.
    pub fn new(
        store: &'a StoreLayout,
        source: &'a dyn ArchiveSource,
        extractor: &'a dyn Extractor,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            store,
            source,
            extractor,
            reporter,
        }
    }

    /// Make `version` available to `project` and return the path of its
    /// runtime binary inside the exposure directory.
    ///
    /// # Errors
    ///
    /// Propagates transport and extraction failures unchanged, and returns
    /// [`NodeRunError::StoreIntegrity`] if the binary is still missing after
    /// every step ran.
    pub async fn ensure_available(
        &self,
        version: &str,
        project: &ProjectLayout,
    ) -> Result<Reconciliation> {
        let downloaded = self.ensure_archive(version).await?;
        let extracted = self.ensure_extracted(version)?;
        let linked = self.rebuild_exposure(version, project)?;

        let binary = project.binary_path();
        if !binary.exists() {
            return Err(NodeRunError::StoreIntegrity(binary));
        }

        Ok(Reconciliation {
            binary,
            downloaded,
            extracted,
            linked,
        })
    }

    async fn ensure_archive(&self, version: &str) -> Result<bool> {
        let archive = self.store.archive_path(version);
        if archive.exists() {
            debug!("Using cached archive {}", archive.display());
            return Ok(false);
        }

        self.store.ensure_dirs()?;
        let remote_path = self.store.platform().remote_path(version);
        self.reporter.info(&format!("Downloading {remote_path}"));
        self.source.fetch(version, &remote_path, &archive).await?;
        Ok(true)
    }

    fn ensure_extracted(&self, version: &str) -> Result<bool> {
        let version_dir = self.store.version_dir(version);
        if self.store.binary_path(version).exists() {
            debug!("Using cached extraction {}", version_dir.display());
            return Ok(false);
        }

        fs::create_dir_all(&version_dir).map_err(|e| {
            NodeRunError::io(format!("creating {}", version_dir.display()), e)
        })?;

        let archive = self.store.archive_path(version);
        self.reporter.extracting(version);
        info!("Extracting {} to {}", archive.display(), version_dir.display());
        self.extractor
            .extract(&archive, &version_dir)
            .map_err(|source| NodeRunError::Extraction { archive, source })?;
        Ok(true)
    }

    /// Empty the exposure directory (keeping the physical lock file) and
    /// link every top-level entry of the version's tree into it.
    fn rebuild_exposure(&self, version: &str, project: &ProjectLayout) -> Result<usize> {
        project.ensure_exposure_dir()?;
        let exposure = project.exposure_dir();
        let lock = project.lock_path();

        for entry in read_dir(&exposure)? {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| NodeRunError::io(format!("inspecting {}", path.display()), e))?;
            if path == lock && file_type.is_file() {
                continue;
            }
            remove_entry(&path, file_type.is_dir())?;
        }

        let version_dir = self.store.version_dir(version);
        let mut entries = read_dir(&version_dir)?;
        entries.sort_by_key(fs::DirEntry::file_name);

        let mut linked = 0;
        for entry in entries {
            let name = entry.file_name();
            if name == LOCK_FILE_NAME {
                let msg = format!("Not linking {} over the version lock", entry.path().display());
                warn!("{msg}");
                self.reporter.warning(&msg);
                continue;
            }

            let dest = exposure.join(&name);
            if let Ok(meta) = dest.symlink_metadata() {
                remove_entry(&dest, meta.is_dir())?;
            }

            let target = entry.path();
            symlink(&target, &dest).map_err(|e| {
                NodeRunError::io(
                    format!("linking {} -> {}", dest.display(), target.display()),
                    e,
                )
            })?;
            linked += 1;
        }

        debug!("Linked {linked} entries from {}", version_dir.display());
        Ok(linked)
    }
}

fn read_dir(dir: &Path) -> Result<Vec<fs::DirEntry>> {
    fs::read_dir(dir)
        .and_then(Iterator::collect)
        .map_err(|e| NodeRunError::io(format!("reading {}", dir.display()), e))
}

/// Remove a file, symlink or real directory without following symlinks.
fn remove_entry(path: &Path, is_real_dir: bool) -> Result<()> {
    let removed = if is_real_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| NodeRunError::io(format!("removing {}", path.display()), e))
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use crate::io::extract::{ExtractError, TarExtractor};
    use noderun_schema::Platform;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LINUX_X64: Platform = Platform {
        os: "linux",
        arch: "x64",
    };

    #[derive(Default)]
    struct WarningLog {
        warnings: std::sync::Mutex<Vec<String>>,
    }

    impl Reporter for WarningLog {
        fn section(&self, _: &str) {}
        fn downloading(&self, _: &str, _: u64, _: Option<u64>) {}
        fn extracting(&self, _: &str) {}
        fn info(&self, _: &str) {}
        fn success(&self, _: &str) {}
        fn warning(&self, msg: &str) {
            self.warnings.lock().unwrap().push(msg.to_string());
        }
    }

    #[derive(Default)]
    struct CountingSource {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ArchiveSource for CountingSource {
        async fn fetch(&self, version: &str, remote_path: &str, dest: &Path) -> Result<()> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            assert!(remote_path.starts_with(&format!("{version}/node-{version}-")));
            fs::write(dest, version).map_err(|e| NodeRunError::io("fake fetch", e))
        }
    }

    /// Lays out a fake release tree; `extra` adds a version-specific entry.
    struct FakeExtractor {
        calls: AtomicUsize,
        write_binary: bool,
        extra: Option<&'static str>,
    }

    impl FakeExtractor {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                write_binary: true,
                extra: None,
            }
        }
    }

    impl Extractor for FakeExtractor {
        fn extract(&self, archive: &Path, dest: &Path) -> std::result::Result<usize, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(archive.is_file());
            fs::create_dir_all(dest.join("bin"))?;
            fs::create_dir_all(dest.join("lib").join("node_modules"))?;
            fs::write(dest.join("LICENSE"), "MIT")?;
            if self.write_binary {
                fs::write(dest.join("bin").join("node"), "node")?;
            }
            if let Some(extra) = self.extra {
                fs::write(dest.join(extra), "extra")?;
            }
            Ok(3)
        }
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        store: StoreLayout,
        project: ProjectLayout,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let store = StoreLayout::new(tmp.path().join("store"), LINUX_X64);
        let project = ProjectLayout::new(tmp.path().join("project"));
        fs::create_dir_all(project.root()).unwrap();
        Fixture {
            _tmp: tmp,
            store,
            project,
        }
    }

    /// Exposure entries mapped to their symlink targets (`None` for non-links).
    fn exposure_snapshot(project: &ProjectLayout) -> BTreeMap<String, Option<PathBuf>> {
        fs::read_dir(project.exposure_dir())
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                let target = fs::read_link(e.path()).ok();
                (e.file_name().to_string_lossy().into_owned(), target)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_second_pass_does_no_work() {
        let fx = fixture();
        let source = CountingSource::default();
        let extractor = FakeExtractor::new();
        let reconciler = StoreReconciler::new(&fx.store, &source, &extractor, &NullReporter);

        let first = reconciler.ensure_available("v20.11.1", &fx.project).await.unwrap();
        let snapshot = exposure_snapshot(&fx.project);
        let second = reconciler.ensure_available("v20.11.1", &fx.project).await.unwrap();

        assert!(first.downloaded && first.extracted);
        assert!(!second.downloaded && !second.extracted);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(exposure_snapshot(&fx.project), snapshot);
        assert_eq!(second.binary, fx.project.binary_path());
        assert_eq!(second.linked, 3);
    }

    #[tokio::test]
    async fn test_switching_versions_leaves_no_stale_links() {
        let fx = fixture();
        fs::create_dir_all(fx.project.exposure_dir()).unwrap();
        fs::write(fx.project.lock_path(), "20").unwrap();

        let source = CountingSource::default();
        let mut extractor = FakeExtractor::new();
        extractor.extra = Some("CHANGELOG.md");
        StoreReconciler::new(&fx.store, &source, &extractor, &NullReporter)
            .ensure_available("v20.11.1", &fx.project)
            .await
            .unwrap();
        assert!(fx.project.exposure_dir().join("CHANGELOG.md").exists());

        let extractor = FakeExtractor::new();
        StoreReconciler::new(&fx.store, &source, &extractor, &NullReporter)
            .ensure_available("v22.1.0", &fx.project)
            .await
            .unwrap();

        let snapshot = exposure_snapshot(&fx.project);
        let b_dir = fx.store.version_dir("v22.1.0");
        assert_eq!(
            snapshot.keys().map(String::as_str).collect::<Vec<_>>(),
            ["LICENSE", "bin", "lib", "version.txt"]
        );
        for (name, target) in &snapshot {
            if name == "version.txt" {
                assert_eq!(*target, None);
            } else {
                assert_eq!(target.as_deref(), Some(b_dir.join(name).as_path()));
            }
        }
        assert_eq!(fs::read_to_string(fx.project.lock_path()).unwrap(), "20");
    }

    #[tokio::test]
    async fn test_foreign_entries_are_removed() {
        let fx = fixture();
        let exposure = fx.project.exposure_dir();
        fs::create_dir_all(exposure.join("bin").join("old")).unwrap();
        fs::write(exposure.join("stray.txt"), "x").unwrap();
        std::os::unix::fs::symlink("/nonexistent", exposure.join("include")).unwrap();

        let source = CountingSource::default();
        let extractor = FakeExtractor::new();
        StoreReconciler::new(&fx.store, &source, &extractor, &NullReporter)
            .ensure_available("v20.11.1", &fx.project)
            .await
            .unwrap();

        let snapshot = exposure_snapshot(&fx.project);
        assert!(!snapshot.contains_key("stray.txt"));
        assert!(!snapshot.contains_key("include"));
        assert!(snapshot["bin"].is_some());
        // The old real directory must not have been written through into the store.
        assert!(!fx.store.version_dir("v20.11.1").join("bin").join("old").exists());
    }

    #[tokio::test]
    async fn test_cached_archive_with_missing_binary_is_reextracted() {
        let fx = fixture();
        fx.store.ensure_dirs().unwrap();
        fs::write(fx.store.archive_path("v20.11.1"), "cached").unwrap();
        fs::create_dir_all(fx.store.version_dir("v20.11.1").join("lib")).unwrap();

        let source = CountingSource::default();
        let extractor = FakeExtractor::new();
        let outcome = StoreReconciler::new(&fx.store, &source, &extractor, &NullReporter)
            .ensure_available("v20.11.1", &fx.project)
            .await
            .unwrap();

        assert!(!outcome.downloaded);
        assert!(outcome.extracted);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_binary_after_extraction_is_integrity_error() {
        let fx = fixture();
        let source = CountingSource::default();
        let mut extractor = FakeExtractor::new();
        extractor.write_binary = false;

        let err = StoreReconciler::new(&fx.store, &source, &extractor, &NullReporter)
            .ensure_available("v20.11.1", &fx.project)
            .await
            .unwrap_err();

        assert!(matches!(err, NodeRunError::StoreIntegrity(p) if p == fx.project.binary_path()));
    }

    #[tokio::test]
    async fn test_extraction_failure_keeps_archive() {
        struct Failing;
        impl Extractor for Failing {
            fn extract(&self, _: &Path, _: &Path) -> std::result::Result<usize, ExtractError> {
                Err(ExtractError::Archive("corrupt".to_string()))
            }
        }

        let fx = fixture();
        let source = CountingSource::default();
        let err = StoreReconciler::new(&fx.store, &source, &Failing, &NullReporter)
            .ensure_available("v20.11.1", &fx.project)
            .await
            .unwrap_err();

        assert!(matches!(err, NodeRunError::Extraction { .. }));
        assert!(fx.store.archive_path("v20.11.1").exists());
        assert!(fx.store.version_dir("v20.11.1").is_dir());
    }

    #[tokio::test]
    async fn test_tree_entry_named_like_lock_is_not_linked() {
        let fx = fixture();
        fs::create_dir_all(fx.project.exposure_dir()).unwrap();
        fs::write(fx.project.lock_path(), "22").unwrap();

        let source = CountingSource::default();
        let mut extractor = FakeExtractor::new();
        extractor.extra = Some("version.txt");
        let reporter = WarningLog::default();
        StoreReconciler::new(&fx.store, &source, &extractor, &reporter)
            .ensure_available("v22.1.0", &fx.project)
            .await
            .unwrap();

        assert!(fs::read_link(fx.project.lock_path()).is_err());
        assert_eq!(fs::read_to_string(fx.project.lock_path()).unwrap(), "22");
        let warnings = reporter.warnings.lock().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("version lock"));
    }

    #[tokio::test]
    async fn test_http_source_and_tar_extractor_end_to_end() {
        use std::io::Write;

        let mut builder = tar::Builder::new(Vec::new());
        let body = b"#!/bin/sh\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o755);
        builder
            .append_data(&mut header, "node-v20.11.1-linux-x64/bin/node", &body[..])
            .unwrap();
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        encoder.write_all(&builder.into_inner().unwrap()).unwrap();
        let archive = encoder.finish().unwrap();

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/dist/v20.11.1/node-v20.11.1-linux-x64.tar.xz")
            .with_status(200)
            .with_body(archive)
            .expect(1)
            .create_async()
            .await;

        let fx = fixture();
        let source = HttpArchiveSource::new(
            Client::new(),
            format!("{}/dist/", server.url()),
            Arc::new(NullReporter),
        );
        let reconciler = StoreReconciler::new(&fx.store, &source, &TarExtractor, &NullReporter);

        let outcome = reconciler.ensure_available("v20.11.1", &fx.project).await.unwrap();
        reconciler.ensure_available("v20.11.1", &fx.project).await.unwrap();

        mock.assert_async().await;
        assert_eq!(fs::read(&outcome.binary).unwrap(), body);
        assert_eq!(
            fs::read_link(fx.project.bin_dir()).unwrap(),
            fx.store.version_dir("v20.11.1").join("bin")
        );
    }
}
