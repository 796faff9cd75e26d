//! Applying paste results to files on disk.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use pasteup_services::WorkspaceEdit;
use tokio::io::AsyncWriteExt as _;

/// Language id for a document, from its extension.
pub fn language_for(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "md" | "markdown" | "mdx" => "markdown",
        "tex" | "latex" => "latex",
        "rst" => "restructuredtext",
        "adoc" | "asciidoc" => "asciidoc",
        "org" => "org",
        "html" | "htm" => "html",
        "txt" | "" => "plaintext",
        other => other,
    }
    .to_owned()
}

/// Nearest ancestor of `document` holding a `.git` entry.
pub fn find_workspace_root(document: &Path) -> Option<PathBuf> {
    document
        .parent()?
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Fail unless `at` is an insertion point of `text`.
pub fn check_offset(text: &str, at: Option<usize>) -> Result<usize> {
    let at = at.unwrap_or(text.len());
    if at > text.len() {
        bail!("Offset {at} is past the end of the document ({} bytes)", text.len());
    }
    if !text.is_char_boundary(at) {
        bail!("Offset {at} is inside a multi-byte character");
    }
    Ok(at)
}

/// Insert `snippet` at byte offset `at`, or append when `at` is `None`.
pub fn insert_snippet(text: &str, at: Option<usize>, snippet: &str) -> Result<String> {
    let at = check_offset(text, at)?;

    let mut out = String::with_capacity(text.len() + snippet.len());
    out.push_str(&text[..at]);
    out.push_str(snippet);
    out.push_str(&text[at..]);
    Ok(out)
}

/// Create every file of `edit`. Existing files are replaced only when the
/// entry allows it.
pub async fn apply_edit(edit: &WorkspaceEdit) -> Result<()> {
    for created in &edit.created_files {
        if let Some(parent) = created.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true);
        if created.overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let mut file = options
            .open(&created.path)
            .await
            .with_context(|| format!("Failed to create file: {}", created.path.display()))?;
        file.write_all(&created.data)
            .await
            .with_context(|| format!("Failed to write file: {}", created.path.display()))?;
        file.flush().await?;
    }
    Ok(())
}

/// Document text. A document that does not exist yet reads as empty.
pub async fn read_document(document: &Path) -> Result<String> {
    match tokio::fs::read_to_string(document).await {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to read document: {}", document.display()))
        }
    }
}

/// Apply `edit`, then write `snippet` into `document`.
pub async fn apply_paste(document: &Path, at: Option<usize>, snippet: &str, edit: &WorkspaceEdit) -> Result<()> {
    let text = read_document(document).await?;
    let updated = insert_snippet(&text, at, snippet)?;

    apply_edit(edit).await?;
    tokio::fs::write(document, updated)
        .await
        .with_context(|| format!("Failed to write document: {}", document.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pasteup_services::CreatedFile;

    #[test]
    fn languages_from_extension() {
        assert_eq!(language_for(Path::new("/a/README.MD")), "markdown");
        assert_eq!(language_for(Path::new("paper.tex")), "latex");
        assert_eq!(language_for(Path::new("notes")), "plaintext");
        assert_eq!(language_for(Path::new("page.typ")), "typ");
    }

    #[test]
    fn insert_at_offset_or_end() {
        assert_eq!(insert_snippet("ab", Some(1), "X").unwrap(), "aXb");
        assert_eq!(insert_snippet("ab", None, "X").unwrap(), "abX");
        assert!(insert_snippet("ab", Some(3), "X").is_err());
        assert!(insert_snippet("é", Some(1), "X").is_err());
    }

    #[test]
    fn workspace_root_is_nearest_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("repo/.git")).unwrap();
        std::fs::create_dir_all(dir.path().join("repo/docs")).unwrap();

        let doc = dir.path().join("repo/docs/a.md");
        assert_eq!(find_workspace_root(&doc), Some(dir.path().join("repo")));
    }

    #[tokio::test]
    async fn overwritable_target_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("one.png");
        std::fs::write(&target, b"old-and-longer").unwrap();

        let mut edit = WorkspaceEdit::new();
        edit.create_file(target.clone(), b"new".to_vec());
        apply_edit(&edit).await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }

    #[tokio::test]
    async fn paste_creates_files_then_edits_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("a.md");
        std::fs::write(&doc, "# Title\n").unwrap();

        let mut edit = WorkspaceEdit::new();
        edit.create_file(dir.path().join("assets/one.png"), vec![1, 2, 3]);

        apply_paste(&doc, None, "![one](assets/one.png)", &edit)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&doc).unwrap(),
            "# Title\n![one](assets/one.png)"
        );
        assert_eq!(std::fs::read(dir.path().join("assets/one.png")).unwrap(), [1, 2, 3]);
    }

    #[tokio::test]
    async fn protected_target_aborts_without_touching_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("a.md");
        std::fs::write(&doc, "body").unwrap();
        std::fs::write(dir.path().join("one.png"), b"old").unwrap();

        let edit = WorkspaceEdit {
            created_files: vec![CreatedFile {
                path: dir.path().join("one.png"),
                data: vec![9],
                overwrite: false,
            }],
        };

        assert!(apply_paste(&doc, None, "link", &edit).await.is_err());
        assert_eq!(std::fs::read_to_string(&doc).unwrap(), "body");
        assert_eq!(std::fs::read(dir.path().join("one.png")).unwrap(), b"old");
    }
}
