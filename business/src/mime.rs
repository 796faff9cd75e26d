//! MIME type detection and extension lookup.

use image::ImageFormat;

/// Magic numbers for non-image formats worth recognizing.
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
    (b"ID3", "audio/mpeg"),
    (b"OggS", "audio/ogg"),
];

/// MIME type from the leading bytes of `data`.
pub fn sniff(data: &[u8]) -> Option<&'static str> {
    if let Ok(format) = image::guess_format(data) {
        return Some(format.to_mime_type());
    }
    SIGNATURES
        .iter()
        .find(|(magic, _)| data.starts_with(magic))
        .map(|(_, mime)| *mime)
}

pub fn mime_from_extension(extension: &str) -> Option<String> {
    if let Some(format) = ImageFormat::from_extension(extension) {
        return Some(format.to_mime_type().to_owned());
    }
    mime_guess::from_ext(extension)
        .first_raw()
        .map(str::to_owned)
}

/// Preferred extension for `mime`, e.g. `jpg` for `image/jpeg`.
pub fn extension_from_mime(mime: &str) -> Option<String> {
    if let Some(ext) = ImageFormat::from_mime_type(mime).and_then(|f| f.extensions_str().first()) {
        return Some((*ext).to_owned());
    }

    let mime = mime.to_lowercase();
    match mime.as_str() {
        "text/plain" => return Some("txt".to_owned()),
        "text/markdown" => return Some("md".to_owned()),
        "image/svg+xml" => return Some("svg".to_owned()),
        _ => {}
    }
    mime_guess::get_mime_extensions_str(&mime)
        .and_then(|exts| exts.first())
        .map(|ext| (*ext).to_owned())
}
