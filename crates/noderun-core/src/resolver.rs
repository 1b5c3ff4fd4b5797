//! Picks exactly one release for an invocation.
//!
//! Selection order:
//! 1. An explicit pin wins outright. It is not looked up in the index and
//!    never touches the lock.
//! 2. Without a lock, the highest LTS major line is chosen (first entry of
//!    that line in index order) and its major is written to the lock.
//! 3. With a lock, the first LTS entry of the locked major line in index
//!    order is chosen. The lock is not rewritten.
//!
//! The index is fetched fresh on every run, so a locked project still
//! follows minor and patch releases of its major line.

use noderun_schema::{Provenance, ReleaseIndex, ReleaseIndexEntry, ResolvedVersion, looks_like_pin};
use tracing::{debug, info};

use crate::error::{NodeRunError, Result};
use crate::lock::LockStore;

/// Resolve the release to use for this invocation.
///
/// # Errors
///
/// Returns [`NodeRunError::NoMatchingRelease`] when no LTS entry satisfies
/// the rule in effect, or a storage error from the lock.
pub fn resolve<L: LockStore + ?Sized>(
    index: &ReleaseIndex,
    pin: Option<&str>,
    lock: &mut L,
) -> Result<ResolvedVersion> {
    if let Some(pin) = pin.filter(|p| looks_like_pin(p)) {
        debug!("Using explicit pin {pin}");
        return Ok(ResolvedVersion::new(pin, Provenance::ExplicitPin));
    }

    match lock.read()? {
        Some(major) => {
            let entry = first_lts_of_major(index, major).ok_or(NodeRunError::NoMatchingRelease {
                locked_major: Some(major),
            })?;
            info!("Locked to major {major}, selected {}", entry.version);
            Ok(ResolvedVersion::new(
                entry.version.as_str(),
                Provenance::LockedMajor,
            ))
        }
        None => {
            let entry = latest_lts(index)
                .ok_or(NodeRunError::NoMatchingRelease { locked_major: None })?;
            lock.write(entry.major())?;
            info!(
                "No lock found, selected {} and locked major {}",
                entry.version,
                entry.major()
            );
            Ok(ResolvedVersion::new(
                entry.version.as_str(),
                Provenance::FirstRunLatestLts,
            ))
        }
    }
}

/// The LTS entry with the highest major; ties go to the earliest in index order.
pub fn latest_lts(index: &ReleaseIndex) -> Option<&ReleaseIndexEntry> {
    index.lts().fold(None, |best: Option<&ReleaseIndexEntry>, entry| match best {
        Some(b) if b.major() >= entry.major() => Some(b),
        _ => Some(entry),
    })
}

/// The first LTS entry in index order whose major equals `major`.
pub fn first_lts_of_major(index: &ReleaseIndex, major: u64) -> Option<&ReleaseIndexEntry> {
    index.lts().find(|e| e.major() == major)
}
