//! Terminal implementations of the pipeline's host ports.

use std::sync::{Mutex, PoisonError};

use inquire::{Confirm, Text};
use pasteup_business::Interaction;
use pasteup_services::ProgressReporter;

use crate::output::Output;

/// Prompts through `inquire`, notices through [`Output`].
///
/// Without a terminal every prompt is declined unless `assume_yes` is set.
pub struct TerminalInteraction {
    out: Output,
    assume_yes: bool,
    interactive: bool,
}

impl TerminalInteraction {
    pub fn new(assume_yes: bool, interactive: bool) -> Self {
        Self {
            out: Output::new(),
            assume_yes,
            interactive,
        }
    }
}

impl Interaction for TerminalInteraction {
    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            self.out.dim(format!("{message} yes"));
            return true;
        }
        if !self.interactive {
            self.out.warning(format!("{message} (declined, no terminal)"));
            return false;
        }
        Confirm::new(message)
            .with_default(false)
            .prompt()
            .unwrap_or(false)
    }

    fn input_filename(&self, placeholder: &str) -> Option<String> {
        if !self.interactive {
            return None;
        }
        Text::new("File name:")
            .with_initial_value(placeholder)
            .prompt_skippable()
            .ok()
            .flatten()
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
    }

    fn info(&self, message: &str) {
        self.out.info(message);
    }

    fn warn(&self, message: &str) {
        self.out.warning(message);
    }

    fn error(&self, message: &str) {
        self.out.error(message);
    }
}

/// Single-line transfer status on stderr.
#[derive(Default)]
pub struct TerminalProgress {
    out: Output,
    title: Mutex<String>,
}

impl ProgressReporter for TerminalProgress {
    fn start(&self, title: &str) {
        title.clone_into(&mut self.title.lock().unwrap_or_else(PoisonError::into_inner));
        self.out.progress(title, "");
    }

    fn advance(&self, done: u64, total: Option<u64>) {
        let status = match total {
            Some(total) if total > 0 => format!("{}%", done.saturating_mul(100) / total),
            _ => format!("{} KiB", done / 1024),
        };
        let title = self.title.lock().unwrap_or_else(PoisonError::into_inner);
        self.out.progress(&*title, status);
    }

    fn finish(&self) {
        self.out.clear_progress();
    }
}
