//! Shared data model for run-node.
//!
//! Nothing in this crate touches the filesystem or the network. The types
//! here describe the remote release catalog, the fixed build platform and
//! the outcome of a version resolution.

pub mod platform;
pub mod release;
pub mod types;
pub mod version;

// Re-exports
pub use platform::*;
pub use release::{IndexError, ReleaseIndex, ReleaseIndexEntry};
pub use types::*;
pub use version::{NodeVersion, VersionParseError, looks_like_pin};

/// Name of the runtime executable inside `bin/` of an extracted release.
pub const RUNTIME_BINARY: &str = "node";
