//! System clipboard as a paste payload source.
//!
//! Copying files in Dolphin, Nautilus or Finder puts `file://` URIs on the
//! clipboard rather than file contents. Such text becomes a `text/uri-list`
//! part so the loader reads the original files. Otherwise the bitmap,
//! re-encoded as PNG, comes first, followed by the HTML flavour (browsers put
//! the `<img src>` of a copied image there) and plain text.

use image::{ImageBuffer, ImageFormat, Rgba};

use crate::payload::{MIME_HTML, MIME_PLAIN_TEXT, MIME_URI_LIST, RawPayload};

/// Filename browsers and screenshot tools give to pasted bitmaps.
pub const CLIPBOARD_IMAGE_FILENAME: &str = "image.png";

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("cannot access the clipboard: {0}")]
    Access(String),
    #[error("cannot encode the clipboard bitmap: {0}")]
    Encode(String),
}

/// Source of paste payloads; swapped for a scripted source in tests.
pub trait ClipboardProvider {
    /// Current clipboard contents. An empty clipboard is an empty payload.
    fn read_payload(&self) -> Result<RawPayload, ClipboardError>;
}

/// The desktop clipboard, through `arboard`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl ClipboardProvider for SystemClipboard {
    fn read_payload(&self) -> Result<RawPayload, ClipboardError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Access(e.to_string()))?;

        let text = clipboard.get_text().ok();
        if let Some(list) = text.as_deref().filter(|t| looks_like_uri_list(t)) {
            log::trace!(
                target: "pasteup_input::clipboard",
                "uri list with {} entries",
                list.lines().count()
            );
            return Ok(RawPayload::new().with_text(MIME_URI_LIST, list));
        }

        let bitmap = match clipboard.get_image() {
            Ok(image) => Some(rgba_to_png(image.width, image.height, &image.bytes)?),
            Err(arboard::Error::ContentNotAvailable) => None,
            Err(e) => return Err(ClipboardError::Access(e.to_string())),
        };

        let html = clipboard.get().html().ok();

        Ok(build_payload(bitmap, html, text))
    }
}

fn build_payload(png: Option<Vec<u8>>, html: Option<String>, text: Option<String>) -> RawPayload {
    let mut payload = RawPayload::new();
    if let Some(png) = png {
        log::trace!(target: "pasteup_input::clipboard", "bitmap of {} bytes", png.len());
        payload = payload.with_file("image/png", CLIPBOARD_IMAGE_FILENAME, png);
    }
    if let Some(html) = html.filter(|h| !h.trim().is_empty()) {
        payload = payload.with_text(MIME_HTML, html);
    }
    if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
        payload = payload.with_text(MIME_PLAIN_TEXT, text);
    }
    payload
}

/// Whether clipboard text consists only of `file://` URIs.
pub fn looks_like_uri_list(text: &str) -> bool {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .peekable();

    lines.peek().is_some() && lines.all(|line| line.to_lowercase().starts_with("file://"))
}

fn rgba_to_png(width: usize, height: usize, rgba: &[u8]) -> Result<Vec<u8>, ClipboardError> {
    let width = u32::try_from(width).map_err(|e| ClipboardError::Encode(e.to_string()))?;
    let height = u32::try_from(height).map_err(|e| ClipboardError::Encode(e.to_string()))?;

    let buffer = ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba.to_vec()).ok_or_else(
        || ClipboardError::Encode(format!("{} bytes do not fit {width}x{height}", rgba.len())),
    )?;

    let mut png = std::io::Cursor::new(Vec::new());
    buffer
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| ClipboardError::Encode(e.to_string()))?;
    Ok(png.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedClipboard(Option<RawPayload>);

    impl ClipboardProvider for ScriptedClipboard {
        fn read_payload(&self) -> Result<RawPayload, ClipboardError> {
            self.0
                .clone()
                .ok_or_else(|| ClipboardError::Access("locked".to_owned()))
        }
    }

    #[test]
    fn scripted_provider_stands_in_for_system() {
        let provider = ScriptedClipboard(Some(build_payload(Some(vec![0x89, b'P']), None, None)));
        let payload = provider.read_payload().unwrap();
        let attachment = payload.attachments().next().unwrap();
        assert_eq!(attachment.filename, CLIPBOARD_IMAGE_FILENAME);
        assert_eq!(attachment.mime_hint, "image/png");

        assert!(ScriptedClipboard(None).read_payload().is_err());
    }

    #[test]
    fn bitmap_precedes_html_and_text() {
        let payload = build_payload(
            Some(vec![1]),
            Some(r#"<img src="https://example.com/a.gif">"#.to_owned()),
            Some("caption".to_owned()),
        );
        let kinds: Vec<&str> = payload.parts().iter().map(|p| p.mime_hint.as_str()).collect();
        assert_eq!(kinds, vec!["image/png", MIME_HTML, MIME_PLAIN_TEXT]);
        assert_eq!(payload.html(), Some(r#"<img src="https://example.com/a.gif">"#));
        assert_eq!(payload.text(MIME_PLAIN_TEXT), Some("caption"));
    }

    #[test]
    fn blank_text_is_dropped() {
        let payload = build_payload(None, Some(" ".to_owned()), Some("  \n".to_owned()));
        assert!(payload.is_empty());
    }

    #[test]
    fn uri_list_detection() {
        assert!(looks_like_uri_list("file:///a.png\nfile:///b.png\n"));
        assert!(looks_like_uri_list("# comment\nFILE:///a.png"));
        assert!(!looks_like_uri_list("file:///a.png\nhello"));
        assert!(!looks_like_uri_list(""));
    }

    #[test]
    fn encodes_png_signature() {
        let png = rgba_to_png(1, 1, &[255, 0, 0, 255]).unwrap();
        assert!(png.starts_with(&[0x89, 0x50, 0x4E, 0x47]));
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        assert!(rgba_to_png(2, 2, &[0, 0, 0, 0]).is_err());
    }
}
