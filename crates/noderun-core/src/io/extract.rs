//! Archive extraction module
//!
//! Handles tar.xz, tar.gz and plain tar release archives. Every entry has
//! its first path segment (the archive's own top-level folder) stripped.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use noderun_schema::ArchiveFormat;
use thiserror::Error;
use tracing::{debug, trace};

/// Failures reported by the extraction engine.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Reading the archive or writing the tree failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The archive name does not map to a known format.
    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// An entry is unsafe or malformed.
    #[error("Archive error: {0}")]
    Archive(String),
}

/// Seam over the extraction engine so store reconciliation can be tested
/// without real archives.
pub trait Extractor: Send + Sync {
    /// Unpack `archive` into `dest`, stripping one leading path segment.
    ///
    /// Returns the number of entries written.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractError`] on the first fatal condition. Whatever
    /// was written before the failure is left in place.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<usize, ExtractError>;
}

/// Streaming tar extractor, format detected from the archive file name.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarExtractor;

impl Extractor for TarExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<usize, ExtractError> {
        extract_auto(archive, dest)
    }
}

/// Detect archive format from file extension
pub fn detect_format(path: &Path) -> Option<ArchiveFormat> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(ArchiveFormat::from_file_name)
}

/// Extract an archive, auto-detecting format
pub fn extract_auto(archive_path: &Path, dest_dir: &Path) -> Result<usize, ExtractError> {
    let format = detect_format(archive_path)
        .ok_or_else(|| ExtractError::UnsupportedFormat(archive_path.display().to_string()))?;

    let reader = BufReader::new(File::open(archive_path)?);
    match format {
        ArchiveFormat::TarXz => extract_tar(xz2::read::XzDecoder::new(reader), dest_dir),
        ArchiveFormat::TarGz => extract_tar(flate2::read::GzDecoder::new(reader), dest_dir),
        ArchiveFormat::Tar => extract_tar(reader, dest_dir),
    }
}

/// Extract a tar stream into `dest_dir`, stripping the first path segment.
pub fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<usize, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_overwrite(true);

    let mut written = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let raw = entry.path()?.to_string_lossy().into_owned();

        let Some(relative_path) = strip_first_component(&raw)? else {
            trace!("Skipping top-level entry {raw}");
            continue;
        };
        reject_symlinked_parents(dest_dir, &relative_path, &raw)?;
        let absolute_path = dest_dir.join(&relative_path);

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }
        if absolute_path
            .symlink_metadata()
            .is_ok_and(|meta| meta.file_type().is_symlink())
        {
            fs::remove_file(&absolute_path)?;
        }

        if entry.header().entry_type().is_hard_link() {
            let target = entry
                .link_name()?
                .map(|p| p.to_string_lossy().into_owned())
                .ok_or_else(|| ExtractError::Archive(format!("Hard link without target: {raw}")))?;
            let target = strip_first_component(&target)?.ok_or_else(|| {
                ExtractError::Archive(format!("Hard link outside the release tree: {raw}"))
            })?;
            reject_symlinked_parents(dest_dir, &target, &raw)?;
            if absolute_path.symlink_metadata().is_ok() {
                fs::remove_file(&absolute_path)?;
            }
            fs::hard_link(dest_dir.join(target), &absolute_path)?;
        } else {
            entry.unpack(&absolute_path)?;
        }
        written += 1;
    }

    debug!("Extracted {written} entries into {}", dest_dir.display());
    Ok(written)
}

/// Fail if any existing parent of `relative` under `dest_dir` is a symlink.
///
/// Symlinks from earlier entries may point anywhere; writing through one
/// would place files outside the destination.
fn reject_symlinked_parents(
    dest_dir: &Path,
    relative: &Path,
    raw: &str,
) -> Result<(), ExtractError> {
    let Some(parent) = relative.parent() else {
        return Ok(());
    };
    let mut current = dest_dir.to_path_buf();
    for component in parent.components() {
        current.push(component);
        match current.symlink_metadata() {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(ExtractError::Archive(format!(
                    "Entry {raw} is below symlink {}",
                    current.display()
                )));
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    Ok(())
}

/// Drop the first `/`-separated segment of an archive path.
///
/// Returns `Ok(None)` for entries that live at the top level (no separator,
/// or nothing after it) and an error for paths that would escape the
/// destination.
fn strip_first_component(raw: &str) -> Result<Option<PathBuf>, ExtractError> {
    let Some((_, rest)) = raw.split_once('/') else {
        return Ok(None);
    };
    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return Ok(None);
    }

    let mut relative = PathBuf::new();
    for component in Path::new(rest).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::Archive(format!(
                    "Invalid path in archive: {raw}"
                )));
            }
        }
    }

    Ok((!relative.as_os_str().is_empty()).then_some(relative))
}
