//! `${token}` substitution for key prefixes, URL bases and workspace paths.

use chrono::{DateTime, Datelike, Local};

/// Values substituted into destination templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVars {
    pub year: String,
    pub month: String,
    pub day: String,
    /// Target document filename without extension.
    pub basename: String,
}

impl TemplateVars {
    pub fn now(basename: impl Into<String>) -> Self {
        Self::at(Local::now(), basename)
    }

    pub fn at<Tz: chrono::TimeZone>(time: DateTime<Tz>, basename: impl Into<String>) -> Self {
        Self {
            year: format!("{:04}", time.year()),
            month: format!("{:02}", time.month()),
            day: format!("{:02}", time.day()),
            basename: basename.into(),
        }
    }

    /// Replace every known token. Unknown tokens are left as written.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("${year}", &self.year)
            .replace("${month}", &self.month)
            .replace("${day}", &self.day)
            .replace("${basename}", &self.basename)
    }
}
