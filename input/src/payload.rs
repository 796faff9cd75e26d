//! Raw paste/drop payloads as handed over by the editor integration.
//!
//! A payload is an ordered bag of parts. Each part carries a MIME hint and
//! either inline file content or string content (URI lists, rich text, plain
//! text). The payload is transient: it lives for one paste or drop and is
//! discarded once the loader has extracted files from it.

/// MIME hint for a newline-delimited list of URIs (RFC 2483).
pub const MIME_URI_LIST: &str = "text/uri-list";
/// MIME hint for rich-text (HTML) clipboard content.
pub const MIME_HTML: &str = "text/html";
/// MIME hint for plain text.
pub const MIME_PLAIN_TEXT: &str = "text/plain";

/// Content of a single payload part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartContent {
    /// An inline file attachment.
    File { filename: String, bytes: Vec<u8> },
    /// String content such as a URI list or an HTML fragment.
    Text(String),
}

/// One `(mime hint, content)` entry of a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadPart {
    pub mime_hint: String,
    pub content: PartContent,
}

/// A borrowed view of a file attachment inside a payload.
#[derive(Debug, Clone, Copy)]
pub struct Attachment<'a> {
    pub mime_hint: &'a str,
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

/// Ordered multi-part paste/drop payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPayload {
    parts: Vec<PayloadPart>,
}

impl RawPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file attachment part.
    pub fn with_file(
        mut self,
        mime_hint: impl Into<String>,
        filename: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.push(PayloadPart {
            mime_hint: mime_hint.into(),
            content: PartContent::File {
                filename: filename.into(),
                bytes,
            },
        });
        self
    }

    /// Append a string part.
    pub fn with_text(mut self, mime_hint: impl Into<String>, text: impl Into<String>) -> Self {
        self.push(PayloadPart {
            mime_hint: mime_hint.into(),
            content: PartContent::Text(text.into()),
        });
        self
    }

    pub fn push(&mut self, part: PayloadPart) {
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[PayloadPart] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// File attachments in payload order.
    pub fn attachments(&self) -> impl Iterator<Item = Attachment<'_>> {
        self.parts.iter().filter_map(|part| match &part.content {
            PartContent::File { filename, bytes } => Some(Attachment {
                mime_hint: part.mime_hint.as_str(),
                filename: filename.as_str(),
                bytes: bytes.as_slice(),
            }),
            PartContent::Text(_) => None,
        })
    }

    /// First string part whose MIME hint matches `mime` (case-insensitive).
    pub fn text(&self, mime: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match &part.content {
            PartContent::Text(text) if part.mime_hint.eq_ignore_ascii_case(mime) => {
                Some(text.as_str())
            }
            _ => None,
        })
    }

    pub fn uri_list(&self) -> Option<&str> {
        self.text(MIME_URI_LIST)
    }

    pub fn html(&self) -> Option<&str> {
        self.text(MIME_HTML)
    }
}
