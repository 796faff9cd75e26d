//! User-facing prompts and notices, provided by the host.

use std::sync::{Mutex, PoisonError};

/// Prompts and notices the pipeline needs from the host.
pub trait Interaction: Send + Sync {
    /// Yes/no question. Anything but explicit acceptance is `false`.
    fn confirm(&self, message: &str) -> bool;

    /// Ask for a filename. `None` when the user cancels.
    fn input_filename(&self, placeholder: &str) -> Option<String>;

    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);
}

/// Scripted interaction that records every notice, for tests and non-interactive runs.
#[derive(Debug, Default)]
pub struct RecordingInteraction {
    confirm_answer: bool,
    filename_answer: Option<String>,
    notices: Mutex<Vec<Notice>>,
}

/// A recorded prompt or notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Confirm(String),
    InputFilename(String),
    Info(String),
    Warn(String),
    Error(String),
}

impl RecordingInteraction {
    /// Declines every prompt.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirming(mut self, answer: bool) -> Self {
        self.confirm_answer = answer;
        self
    }

    pub fn answering_filename(mut self, name: impl Into<String>) -> Self {
        self.filename_answer = Some(name.into());
        self
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.filter(|n| match n {
            Notice::Warn(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn errors(&self) -> Vec<String> {
        self.filter(|n| match n {
            Notice::Error(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn prompts(&self) -> usize {
        self.notices()
            .iter()
            .filter(|n| matches!(n, Notice::Confirm(_) | Notice::InputFilename(_)))
            .count()
    }

    fn filter(&self, pick: impl Fn(&Notice) -> Option<String>) -> Vec<String> {
        self.notices().iter().filter_map(pick).collect()
    }

    fn record(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

impl Interaction for RecordingInteraction {
    fn confirm(&self, message: &str) -> bool {
        self.record(Notice::Confirm(message.to_owned()));
        self.confirm_answer
    }

    fn input_filename(&self, placeholder: &str) -> Option<String> {
        self.record(Notice::InputFilename(placeholder.to_owned()));
        self.filename_answer.clone()
    }

    fn info(&self, message: &str) {
        self.record(Notice::Info(message.to_owned()));
    }

    fn warn(&self, message: &str) {
        self.record(Notice::Warn(message.to_owned()));
    }

    fn error(&self, message: &str) {
        self.record(Notice::Error(message.to_owned()));
    }
}
