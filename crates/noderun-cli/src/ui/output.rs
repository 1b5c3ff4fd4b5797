//! Console reporter.
//!
//! Everything goes to stderr so the runtime keeps stdout to itself. Download
//! progress redraws a single line when stderr is a terminal and is reduced
//! to a start and a finish line otherwise.

use std::io::{IsTerminal, Write, stderr};
use std::sync::{Arc, Mutex};

use crossterm::QueueableCommand;
use crossterm::cursor::MoveToColumn;
use crossterm::style::{Stylize, style};
use crossterm::terminal::{Clear, ClearType};
use noderun_core::Reporter;

use super::theme::{Theme, format_size};

#[derive(Debug, Default)]
struct ProgressState {
    /// Version whose download line is currently open.
    open: Option<String>,
}

/// A cloneable handle writing styled status lines to stderr.
#[derive(Debug, Clone)]
pub struct Output {
    theme: Arc<Theme>,
    interactive: bool,
    progress: Arc<Mutex<ProgressState>>,
}

impl Output {
    /// Create a new output handle.
    pub fn new() -> Self {
        Self {
            theme: Arc::new(Theme::default()),
            interactive: stderr().is_terminal(),
            progress: Arc::default(),
        }
    }

    /// Prints an error message.
    pub fn error(&self, msg: &str) {
        self.close_progress();
        eprintln!("{} {}", self.theme.icons.error.red(), msg.red());
    }

    fn close_progress(&self) {
        let Ok(mut state) = self.progress.lock() else {
            return;
        };
        if state.open.take().is_some() && self.interactive {
            eprintln!();
        }
    }

    fn redraw(&self, line: &str) {
        let mut err = stderr().lock();
        let _ = err.queue(MoveToColumn(0));
        let _ = err.queue(Clear(ClearType::CurrentLine));
        let _ = write!(err, "{line}");
        let _ = err.flush();
    }

    fn progress_line(&self, version: &str, current: u64, total: Option<u64>) -> String {
        let amount = match total.filter(|&t| t > 0) {
            Some(total) => format!("{} / {}", format_size(current), format_size(total)),
            None => format_size(current),
        };
        format!(
            "{} Downloading {} {}",
            self.theme.icons.active.yellow(),
            style(version).with(self.theme.secondary),
            style(amount).with(self.theme.header)
        )
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        self.close_progress();
        eprintln!(
            "{} {}",
            title.bold(),
            style("─".repeat(self.theme.rule_width)).with(self.theme.header)
        );
    }

    fn downloading(&self, version: &str, current: u64, total: Option<u64>) {
        let Ok(mut state) = self.progress.lock() else {
            return;
        };
        let first = state.open.as_deref() != Some(version);
        let finished = total.is_some_and(|t| current >= t);

        if first {
            state.open = Some(version.to_string());
        }
        if self.interactive {
            self.redraw(&self.progress_line(version, current, total));
            if finished {
                eprintln!();
                state.open = None;
            }
        } else if first || finished {
            eprintln!("{}", self.progress_line(version, current, total));
            if finished {
                state.open = None;
            }
        }
    }

    fn extracting(&self, version: &str) {
        self.close_progress();
        eprintln!(
            "{} Extracting {}",
            self.theme.icons.active.yellow(),
            style(version).with(self.theme.secondary)
        );
    }

    fn info(&self, msg: &str) {
        self.close_progress();
        eprintln!("{} {msg}", style(self.theme.icons.info).with(self.theme.header));
    }

    fn success(&self, msg: &str) {
        self.close_progress();
        eprintln!("{} {}", self.theme.icons.success.green(), msg.green());
    }

    fn warning(&self, msg: &str) {
        self.close_progress();
        eprintln!("{} {}", self.theme.icons.warning.yellow(), msg.yellow());
    }
}
