//! Resolution outcome types.

use std::fmt;

/// How a version was chosen for this invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Given on the command line; no index lookup, no lock interaction.
    ExplicitPin,
    /// First LTS entry of the major line recorded in the project lock.
    LockedMajor,
    /// No lock existed; newest LTS major line, now recorded in the lock.
    FirstRunLatestLts,
}

impl Provenance {
    /// Kebab-case tag used in log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExplicitPin => "explicit-pin",
            Self::LockedMajor => "locked-major",
            Self::FirstRunLatestLts => "first-run-latest-lts",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The release picked for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// Version string including the leading `v`.
    pub version: String,
    /// Which rule selected it.
    pub provenance: Provenance,
}

impl ResolvedVersion {
    /// Create a resolution outcome.
    pub fn new(version: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            version: version.into(),
            provenance,
        }
    }
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.version, self.provenance)
    }
}
