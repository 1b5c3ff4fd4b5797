//! Error taxonomy for a run-node invocation.
//!
//! Every variant is fatal. Nothing in the core retries or recovers; errors
//! travel to the top of the invocation and end it with exit status 1.

use std::path::PathBuf;

use noderun_schema::IndexError;
use thiserror::Error;

use crate::io::extract::ExtractError;

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, NodeRunError>;

/// All failures the core can surface.
#[derive(Error, Debug)]
pub enum NodeRunError {
    /// No LTS release satisfied the selection rule.
    #[error("{}", no_match_message(*locked_major))]
    NoMatchingRelease {
        /// Major line recorded in the project lock, if one was in effect.
        locked_major: Option<u64>,
    },

    /// Network failure while fetching the index or an archive.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// URL being fetched.
        url: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// Local write failure while streaming a download to disk.
    #[error("failed to write download from {url} to {}: {source}", path.display())]
    TransportIo {
        /// URL being fetched.
        url: String,
        /// Destination file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The release index body could not be understood.
    #[error("malformed release index: {0}")]
    MalformedIndex(#[from] IndexError),

    /// The archive could not be unpacked.
    #[error("extraction of {} failed: {source}", archive.display())]
    Extraction {
        /// Archive being extracted.
        archive: PathBuf,
        /// Underlying extraction error.
        #[source]
        source: ExtractError,
    },

    /// The runtime binary is missing after a full reconciliation pass.
    #[error("runtime binary not found at {}", .0.display())]
    StoreIntegrity(PathBuf),

    /// An installer or launch subprocess failed.
    #[error("command `{command}` {status}")]
    Subprocess {
        /// Rendered command line.
        command: String,
        /// How it failed (exit code, signal, or spawn error).
        status: String,
    },

    /// Not enough command-line arguments.
    #[error("Usage: {program} [vMAJOR.MINOR.PATCH] <args to node>")]
    Usage {
        /// Name the tool was invoked as.
        program: String,
    },

    /// Filesystem failure outside the download path.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

fn no_match_message(locked_major: Option<u64>) -> String {
    match locked_major {
        Some(major) => format!("no LTS release found for locked major version {major}"),
        None => "no LTS release found in the release index".to_string(),
    }
}

impl NodeRunError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a subprocess error
    pub fn subprocess(command: impl Into<String>, status: impl Into<String>) -> Self {
        Self::Subprocess {
            command: command.into(),
            status: status.into(),
        }
    }
}
