use std::sync::LazyLock;

use pasteup_input::ResourceFile;
use regex::{Captures, Regex};

use crate::config::ScopeSettings;

static TOKEN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\$\{(\w+)\}").ok());

/// Text inserted into the document for an uploaded file.
///
/// Images use `imageSnippet`, everything else `defaultSnippet`. Supported
/// tokens: `${url}`, `${filename}`, `${filenameWithoutExtension}`,
/// `${extension}`, `${mimeType}`. Substituted values are not rescanned and
/// unknown tokens are kept as written.
pub fn generate_snippet(settings: &ScopeSettings, file: &ResourceFile, url: &str) -> String {
    let template = if file.is_image() {
        &settings.image_snippet
    } else {
        &settings.default_snippet
    };

    let Some(token) = TOKEN.as_ref() else {
        return template.clone();
    };

    token
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "url" => url.to_owned(),
            "filename" => file.filename(),
            "filenameWithoutExtension" => file.name.clone(),
            "extension" => file.extension.clone(),
            "mimeType" => file.mime.clone(),
            _ => caps[0].to_owned(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_and_default_templates() {
        let settings = ScopeSettings::default();

        let image = ResourceFile::new("shot", "image/png", "png", vec![]);
        assert_eq!(
            generate_snippet(&settings, &image, "https://x/shot.png"),
            "![shot](https://x/shot.png)"
        );

        let pdf = ResourceFile::new("paper", "application/pdf", "pdf", vec![]);
        assert_eq!(
            generate_snippet(&settings, &pdf, "https://x/paper.pdf"),
            "[paper.pdf](https://x/paper.pdf)"
        );
    }

    #[test]
    fn all_tokens_substituted() {
        let settings = ScopeSettings {
            default_snippet: "${url}|${filename}|${filenameWithoutExtension}|${extension}|${mimeType}"
                .to_owned(),
            ..Default::default()
        };
        let file = ResourceFile::new("notes", "text/plain", "txt", vec![]);
        assert_eq!(
            generate_snippet(&settings, &file, "u"),
            "u|notes.txt|notes|txt|text/plain"
        );
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let settings = ScopeSettings {
            default_snippet: "[${filename}](${url}) ${unknown}".to_owned(),
            ..Default::default()
        };
        let file = ResourceFile::new("${mimeType}", "text/plain", "txt", vec![]);
        assert_eq!(
            generate_snippet(&settings, &file, "https://x/${extension}"),
            "[${mimeType}.txt](https://x/${extension}) ${unknown}"
        );
    }

    #[test]
    fn missing_extension_leaves_bare_name() {
        let settings = ScopeSettings {
            default_snippet: "${filename}.${extension}".to_owned(),
            ..Default::default()
        };
        let file = ResourceFile::new("blob", "application/octet-stream", "", vec![]);
        assert_eq!(generate_snippet(&settings, &file, "u"), "blob.");
    }
}
