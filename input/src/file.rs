//! File candidates extracted from a payload, before and after identity completion.

/// Fallback MIME type for content whose type could not be determined.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A file candidate whose identity may still be incomplete.
///
/// The name never contains the extension; `extension` never contains the dot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncompleteFile {
    pub name: Option<String>,
    pub mime: Option<String>,
    pub extension: Option<String>,
    pub data: Vec<u8>,
}

impl IncompleteFile {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Build a candidate from a filename such as `photo.png`, splitting off the extension.
    pub fn from_filename(filename: &str, data: Vec<u8>) -> Self {
        let (name, extension) = split_filename(filename);
        Self {
            name,
            mime: None,
            extension,
            data,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        self.mime = (!mime.trim().is_empty()).then(|| mime.trim().to_owned());
        self
    }

    /// Promote into a complete file, defaulting remaining gaps.
    ///
    /// Returns `None` when no usable name is present.
    pub fn complete(self) -> Option<ResourceFile> {
        let name = self.name.filter(|n| !n.is_empty())?;
        Some(ResourceFile {
            name,
            mime: self
                .mime
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| OCTET_STREAM.to_owned()),
            extension: self.extension.unwrap_or_default(),
            data: self.data,
        })
    }
}

/// A file ready for upload.
///
/// Within one batch `name` is unique; `mime` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFile {
    pub name: String,
    pub mime: String,
    pub extension: String,
    pub data: Vec<u8>,
}

impl ResourceFile {
    pub fn new(
        name: impl Into<String>,
        mime: impl Into<String>,
        extension: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            extension: extension.into(),
            data,
        }
    }

    /// The name with the extension appended when there is one.
    pub fn filename(&self) -> String {
        if self.extension.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.extension)
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// Split `archive.tar.gz` into (`archive.tar`, `gz`).
///
/// Dot-files like `.env` keep their full name and get no extension.
pub fn split_filename(filename: &str) -> (Option<String>, Option<String>) {
    let filename = filename.trim();
    if filename.is_empty() {
        return (None, None);
    }

    match filename.rfind('.') {
        Some(0) | None => (Some(filename.to_owned()), None),
        Some(idx) if idx == filename.len() - 1 => (Some(filename[..idx].to_owned()), None),
        Some(idx) => (
            Some(filename[..idx].to_owned()),
            Some(filename[idx + 1..].to_lowercase()),
        ),
    }
}
