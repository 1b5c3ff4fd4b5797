//! Release version strings of the form `vMAJOR.MINOR.PATCH`.
//!
//! The leading `v` is part of the identifier: it appears in the remote
//! index, in archive file names and in store directory names, so the
//! original string is always kept alongside the parsed numbers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while parsing a release version string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    /// The string does not start with `v`.
    #[error("version '{0}' does not start with 'v'")]
    MissingPrefix(String),

    /// The string does not have three dot-separated components.
    #[error("version '{0}' is not of the form vMAJOR.MINOR.PATCH")]
    Shape(String),

    /// A component is not a decimal number.
    #[error("version '{input}' has a non-numeric {component} component")]
    NotNumeric {
        /// The full input string.
        input: String,
        /// Which component failed (`major`, `minor` or `patch`).
        component: &'static str,
    },
}

/// A parsed release version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeVersion {
    raw: String,
    /// Major release line (e.g. `20` for `v20.11.1`).
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl NodeVersion {
    /// Parse a `vMAJOR.MINOR.PATCH` string.
    ///
    /// A pre-release or build suffix after the patch number (`-rc.1`,
    /// `+build`) is tolerated and kept in the raw string.
    ///
    /// # Errors
    ///
    /// Returns a [`VersionParseError`] describing the first rule violated.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let rest = input
            .strip_prefix('v')
            .ok_or_else(|| VersionParseError::MissingPrefix(input.to_string()))?;

        let mut parts = rest.splitn(3, '.');
        let (Some(major), Some(minor), Some(patch)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(VersionParseError::Shape(input.to_string()));
        };

        let digits = patch.bytes().take_while(u8::is_ascii_digit).count();
        let suffix = &patch[digits..];
        if !(suffix.is_empty() || suffix.starts_with('-') || suffix.starts_with('+')) {
            return Err(VersionParseError::NotNumeric {
                input: input.to_string(),
                component: "patch",
            });
        }

        Ok(Self {
            raw: input.to_string(),
            major: numeric(input, major, "major")?,
            minor: numeric(input, minor, "minor")?,
            patch: numeric(input, &patch[..digits], "patch")?,
        })
    }

    /// The original version string, including the leading `v`.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn numeric(input: &str, part: &str, component: &'static str) -> Result<u64, VersionParseError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionParseError::NotNumeric {
            input: input.to_string(),
            component,
        });
    }
    part.parse().map_err(|_| VersionParseError::NotNumeric {
        input: input.to_string(),
        component,
    })
}

impl FromStr for NodeVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Whether a command-line argument should be treated as a version pin.
///
/// Only the shape is checked: a `v` followed by an ASCII digit. Whether the
/// release actually exists is discovered later, when its archive is fetched.
///
/// # Example
///
/// ```
/// use noderun_schema::looks_like_pin;
///
/// assert!(looks_like_pin("v20.11.1"));
/// assert!(!looks_like_pin("script.js"));
/// assert!(!looks_like_pin("v"));
/// ```
pub fn looks_like_pin(arg: &str) -> bool {
    let mut bytes = arg.bytes();
    bytes.next() == Some(b'v') && bytes.next().is_some_and(|b| b.is_ascii_digit())
}
