//! Terminal output for run-node.
//!
//! - [`theme`] - Colors, icons and size formatting
//! - [`output`] - The [`Output`] reporter handed to the core

pub mod output;
pub mod theme;

pub use output::Output;
pub use theme::Theme;
