//! Styled terminal output.
//!
//! Status lines go to stderr so stdout stays clean for snippets and
//! completions.

use std::fmt::Display;

use console::{StyledObject, Term, style};

/// Marker-prefixed status lines on stderr.
pub struct Output {
    term: Term,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn status(&self, marker: StyledObject<&str>, message: impl Display) {
        drop(self.term.write_line(&format!("{} {message}", marker.bold())));
    }

    pub fn success(&self, message: impl Display) {
        self.status(style("✓").green(), message);
    }

    pub fn error(&self, message: impl Display) {
        self.status(style("✗").red(), message);
    }

    pub fn warning(&self, message: impl Display) {
        self.status(style("⚠").yellow(), message);
    }

    pub fn info(&self, message: impl Display) {
        self.status(style("ℹ").blue(), message);
    }

    pub fn dim(&self, message: impl Display) {
        drop(self.term.write_line(&style(message).dim().to_string()));
    }

    /// Print an undo history row.
    pub fn history_item(&self, index: usize, title: impl Display) {
        drop(self.term.write_line(&format!(
            "  {} {title}",
            style(format!("[{index}]")).cyan().bold()
        )));
    }

    /// Overwrite the current line with a transfer status.
    pub fn progress(&self, title: impl Display, status: impl Display) {
        drop(self.term.clear_line());
        drop(self.term.write_str(&format!(
            "{} {}",
            style(title).bold(),
            style(status).dim()
        )));
    }

    pub fn clear_progress(&self) {
        drop(self.term.clear_line());
    }
}
