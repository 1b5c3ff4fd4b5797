//! The single OS/architecture pair a build targets.
//!
//! run-node only ever fetches archives for the platform it was compiled
//! for. The names follow the distribution host's conventions (`linux`,
//! `darwin`, `x64`, `arm64`), not Rust's target triples.
//!
//! # Example
//!
//! ```
//! use noderun_schema::Platform;
//!
//! let platform = Platform::current();
//! let name = platform.archive_filename("v20.11.1");
//! assert!(name.starts_with("node-v20.11.1-"));
//! ```

use std::fmt;

/// Compression/container format of a release archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// xz-compressed tar archive (`.tar.xz`).
    TarXz,
    /// Gzip-compressed tar archive (`.tar.gz`).
    TarGz,
    /// Uncompressed tar archive (`.tar`).
    Tar,
}

impl ArchiveFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::TarXz => "tar.xz",
            Self::TarGz => "tar.gz",
            Self::Tar => "tar",
        }
    }

    /// Detect the format from a file name, case-insensitively.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// Operating system and CPU architecture of the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Distribution OS name (`linux` or `darwin`).
    pub os: &'static str,
    /// Distribution architecture name (`x64` or `arm64`).
    pub arch: &'static str,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        #[cfg(target_os = "macos")]
        let os = "darwin";
        #[cfg(not(target_os = "macos"))]
        let os = "linux";

        #[cfg(target_arch = "aarch64")]
        let arch = "arm64";
        #[cfg(not(target_arch = "aarch64"))]
        let arch = "x64";

        Self { os, arch }
    }

    /// Archive format published for this platform.
    pub fn archive_format(self) -> ArchiveFormat {
        if self.os == "darwin" {
            ArchiveFormat::TarGz
        } else {
            ArchiveFormat::TarXz
        }
    }

    /// `node-<version>-<os>-<arch>.<ext>`
    pub fn archive_filename(self, version: &str) -> String {
        format!(
            "node-{version}-{}-{}.{}",
            self.os,
            self.arch,
            self.archive_format().extension()
        )
    }

    /// Path of the archive relative to the distribution base URL.
    pub fn remote_path(self, version: &str) -> String {
        format!("{version}/{}", self.archive_filename(version))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
