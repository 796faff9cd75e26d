//! URI lists and rich-text image sources.
//!
//! File managers (Dolphin, Nautilus, Finder) put `file://` URIs on the
//! clipboard or in a drop instead of file contents. Browsers put an HTML
//! fragment whose `<img src>` points at the original asset.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

/// Where a URI from a URI list points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriTarget {
    /// A path on the local filesystem.
    Local(PathBuf),
    /// An `http`/`https` resource, fetched over the network.
    Remote(String),
}

/// Parse a `text/uri-list` body into its URIs.
///
/// Blank lines and `#` comment lines are skipped.
pub fn parse_uri_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

/// Classify a URI. Unsupported schemes yield `None`.
pub fn classify_uri(uri: &str) -> Option<UriTarget> {
    let uri = uri.trim();
    let lower = uri.to_lowercase();

    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(UriTarget::Remote(uri.to_owned()));
    }

    if let Some(path) = file_uri_to_path(uri) {
        return Some(UriTarget::Local(path));
    }

    // Some drop sources hand out bare absolute paths.
    let path = PathBuf::from(uri);
    if path.is_absolute() {
        return Some(UriTarget::Local(path));
    }

    log::trace!(
        target: "pasteup_input::uri",
        "unsupported_uri uri={uri}",
    );
    None
}

/// Extract a filesystem path from a `file://` URI.
///
/// Handles URL decoding for paths with special characters (spaces, unicode, etc.)
/// and the `file://localhost/` form.
pub fn file_uri_to_path(uri: &str) -> Option<PathBuf> {
    let uri = uri.trim();

    let mut rest = uri
        .get(..7)
        .filter(|scheme| scheme.eq_ignore_ascii_case("file://"))
        .and(uri.get(7..))?;
    if rest
        .get(..9)
        .is_some_and(|host| host.eq_ignore_ascii_case("localhost"))
    {
        rest = &rest[9..];
    }

    let decoded = urlencoding::decode(rest).ok()?;

    // `file:///C:/dir/a.png` on Windows.
    let path = match decoded.as_bytes() {
        [b'/', drive, b':', ..] if drive.is_ascii_alphabetic() && cfg!(windows) => {
            PathBuf::from(&decoded[1..])
        }
        _ => PathBuf::from(decoded.as_ref()),
    };

    Some(path)
}

/// Last path segment of a URL, without query or fragment, percent-decoded.
pub fn url_filename(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next()?;
    let after_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    let (_, path) = after_scheme.split_once('/')?;
    let segment = path.rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }
    urlencoding::decode(segment).ok().map(|s| s.into_owned())
}

static IMG_SRC: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).ok()
});

/// First `<img src>` of an HTML fragment, with HTML entities in the URL unescaped.
pub fn find_image_source(html: &str) -> Option<String> {
    let regex = IMG_SRC.as_ref()?;
    let captures = regex.captures(html)?;
    let raw = captures
        .get(1)
        .or_else(|| captures.get(2))
        .or_else(|| captures.get(3))?
        .as_str()
        .trim();

    if raw.is_empty() {
        return None;
    }

    Some(
        raw.replace("&amp;", "&")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">"),
    )
}
