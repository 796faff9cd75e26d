//! Input sources for pasteup: paste/drop payloads and the system clipboard.
//!
//! This crate provides the data model the editor integration hands to the
//! upload pipeline, plus helpers to interpret it.
//!
//! # Modules
//!
//! - [`payload`]: Multi-part paste/drop payload ([`RawPayload`])
//! - [`file`]: File candidates ([`IncompleteFile`]) and upload-ready files ([`ResourceFile`])
//! - [`uri`]: `text/uri-list` parsing and `<img src>` extraction
//! - [`clipboard`]: System clipboard access producing a [`RawPayload`]

pub mod clipboard;
pub mod file;
pub mod payload;
pub mod uri;

pub use clipboard::{ClipboardError, ClipboardProvider, SystemClipboard};
pub use file::{IncompleteFile, OCTET_STREAM, ResourceFile, split_filename};
pub use payload::{
    Attachment, MIME_HTML, MIME_PLAIN_TEXT, MIME_URI_LIST, PartContent, PayloadPart, RawPayload,
};
pub use uri::{UriTarget, classify_uri, find_image_source, parse_uri_list, url_filename};
