//! Core library for run-node.
//!
//! Resolves which runtime release a project should use, makes sure that
//! release is downloaded and extracted into the shared store, exposes it
//! through the project's `.node` directory and finally hands the process
//! over to the runtime.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.local/share/run-node/      # shared store (NODERUN_HOME)
//! ├── archives/                 # node-<version>-<os>-<arch>.<ext>
//! └── versions/<version>/       # extracted trees
//!
//! <project>/.node/
//! ├── version.txt               # major version lock (physical file)
//! └── bin, lib, ...             # symlinks into versions/<version>/
//! ```

pub mod config;
pub mod error;
pub mod install;
pub mod io;
pub mod launch;
pub mod lock;
pub mod paths;
pub mod reporter;
pub mod resolver;
pub mod store;

pub use config::Settings;
pub use error::{NodeRunError, Result};
pub use paths::*;
pub use reporter::{NullReporter, Reporter};

/// User Agent string sent with every request
pub const USER_AGENT: &str = concat!("noderun/", env!("CARGO_PKG_VERSION"));
