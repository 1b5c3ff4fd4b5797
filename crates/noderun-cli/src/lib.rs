//! run-node - per-project Node.js runtime launcher
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Resolves the runtime release a project should use, makes sure it is in
//! the shared store, exposes it through `<project>/.node` and replaces
//! itself with that runtime.
//!
//! # Usage
//!
//! ```text
//! run-node [vMAJOR.MINOR.PATCH] <args to node>
//! ```
//!
//! Nothing on the command line is interpreted except an optional leading
//! version pin; `--help` and friends go to the runtime.

pub mod cmd;
pub mod ui;

use std::ffi::OsString;

use clap::Parser;
use noderun_schema::looks_like_pin;

/// Name used in usage messages when argv[0] is unavailable.
pub const PROGRAM_NAME: &str = "run-node";

#[derive(Debug, Parser)]
#[command(name = "run-node")]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Optional version pin followed by arguments for the runtime
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
    pub args: Vec<OsString>,
}

impl Cli {
    /// Parse `argv` (program name first) without dropping anything.
    ///
    /// clap treats a leading `--` as its own delimiter and swallows it; the
    /// runtime gets it back here so every argument is forwarded verbatim.
    pub fn from_argv<I, T>(argv: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let raw: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        let mut cli = Self::parse_from(raw.iter().cloned());
        let forwarded = raw.len().saturating_sub(1);
        if cli.args.len() < forwarded && raw.get(1).is_some_and(|first| first == "--") {
            cli.args.insert(0, OsString::from("--"));
        }
        cli
    }
}

/// Separate a leading version pin from the runtime's arguments.
///
/// # Example
///
/// ```
/// use noderun_cli::split_pin;
///
/// let (pin, rest) = split_pin(vec!["v20.11.1".into(), "app.js".into()]);
/// assert_eq!(pin.as_deref(), Some("v20.11.1"));
/// assert_eq!(rest, vec![std::ffi::OsString::from("app.js")]);
/// ```
pub fn split_pin(mut args: Vec<OsString>) -> (Option<String>, Vec<OsString>) {
    let pin = args
        .first()
        .and_then(|first| first.to_str())
        .filter(|first| looks_like_pin(first))
        .map(str::to_string);
    if pin.is_some() {
        args.remove(0);
    }
    (pin, args)
}

/// File name of argv[0], falling back to [`PROGRAM_NAME`].
pub fn program_name() -> String {
    std::env::args_os()
        .next()
        .and_then(|arg0| {
            std::path::Path::new(&arg0)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| PROGRAM_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_split_pin() {
        let (pin, rest) = split_pin(os(&["v18.20.0", "--version"]));
        assert_eq!(pin.as_deref(), Some("v18.20.0"));
        assert_eq!(rest, os(&["--version"]));
    }

    #[test]
    fn test_non_pin_first_argument_is_forwarded() {
        for first in ["app.js", "version", "v", "vx1", "-v"] {
            let (pin, rest) = split_pin(os(&[first, "a"]));
            assert_eq!(pin, None, "{first}");
            assert_eq!(rest, os(&[first, "a"]));
        }
    }

    #[test]
    fn test_only_pin() {
        let (pin, rest) = split_pin(os(&["v22.1.0"]));
        assert_eq!(pin.as_deref(), Some("v22.1.0"));
        assert!(rest.is_empty());
        assert_eq!(split_pin(Vec::new()), (None, Vec::new()));
    }

    #[test]
    fn test_cli_forwards_everything() {
        let cli = Cli::parse_from(["run-node", "v20.0.0", "--help", "-e", "1", "--version"]);
        assert_eq!(cli.args, os(&["v20.0.0", "--help", "-e", "1", "--version"]));

        let cli = Cli::parse_from(["run-node", "--inspect", "app.js"]);
        assert_eq!(cli.args, os(&["--inspect", "app.js"]));

        let cli = Cli::parse_from(["run-node"]);
        assert!(cli.args.is_empty());
    }

    #[test]
    fn test_leading_double_dash_is_kept() {
        let cases: [&[&str]; 4] = [
            &["--", "x"],
            &["--"],
            &["--", "--"],
            &["v20.0.0", "--", "app.js"],
        ];
        for args in cases {
            let argv = std::iter::once("run-node").chain(args.iter().copied());
            assert_eq!(Cli::from_argv(argv).args, os(args), "{args:?}");
        }
    }
}
