//! Workspace folder destination.
//!
//! Files are not written here: they are added to the caller's
//! [`WorkspaceEdit`](super::WorkspaceEdit) so the host applies them together
//! with the text change, under its own undo stack.

use std::path::PathBuf;

use pasteup_input::ResourceFile;
use tracing::debug;

use super::template::TemplateVars;
use super::types::{DocumentRef, UploadContext, UploadResult};
use crate::config::WorkspaceSettings;
use crate::error::UploadError;

#[derive(Debug, Clone)]
pub struct WorkspaceUploader {
    settings: WorkspaceSettings,
}

impl WorkspaceUploader {
    pub fn new(settings: WorkspaceSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &WorkspaceSettings {
        &self.settings
    }

    /// Where `filename` lands for `document`.
    pub fn target_path(
        &self,
        vars: &TemplateVars,
        document: &DocumentRef,
        filename: &str,
    ) -> Result<PathBuf, UploadError> {
        let root = document
            .workspace_root
            .as_deref()
            .ok_or_else(|| UploadError::NoWorkspace(document.path.display().to_string()))?;

        let relative = vars.render(&self.settings.path);
        let mut path = root.to_path_buf();
        for segment in relative.split('/').filter(|s| !s.is_empty() && *s != ".") {
            path.push(segment);
        }
        path.push(filename);
        Ok(path)
    }

    pub fn link(&self, vars: &TemplateVars, filename: &str) -> String {
        format!(
            "{}{}",
            vars.render(&self.settings.link_base),
            urlencoding::encode(filename)
        )
    }

    pub async fn upload_file(
        &self,
        file: &ResourceFile,
        ctx: &mut UploadContext<'_>,
    ) -> Result<UploadResult, UploadError> {
        let vars = TemplateVars::now(ctx.document.basename());
        let filename = file.filename();
        let path = self.target_path(&vars, ctx.document, &filename)?;

        debug!(target: "pasteup_services::workspace", path = %path.display(), "queueing file creation");
        ctx.edit.create_file(path, file.data.clone());

        Ok(UploadResult::new(self.link(&vars, &filename)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::storage::types::WorkspaceEdit;
    use chrono::{TimeZone, Utc};
    use tokio_util::sync::CancellationToken;

    fn vars() -> TemplateVars {
        TemplateVars::at(Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap(), "today")
    }

    #[test]
    fn target_path_renders_template_under_root() {
        let uploader = WorkspaceUploader::new(WorkspaceSettings {
            path: "assets/${year}/${basename}".to_owned(),
            link_base: String::new(),
        });
        let doc = DocumentRef::new("/ws/notes/today.md", "markdown").with_workspace_root("/ws");

        assert_eq!(
            uploader.target_path(&vars(), &doc, "a.png").unwrap(),
            PathBuf::from("/ws/assets/2024/today/a.png")
        );
    }

    #[test]
    fn link_uses_link_base() {
        let uploader = WorkspaceUploader::new(WorkspaceSettings {
            path: String::new(),
            link_base: "../img/${year}/".to_owned(),
        });
        assert_eq!(uploader.link(&vars(), "my pic.png"), "../img/2024/my%20pic.png");
    }

    #[tokio::test]
    async fn upload_queues_file_without_undo() {
        let uploader = WorkspaceUploader::new(WorkspaceSettings::default());
        let doc = DocumentRef::new("/ws/readme.md", "markdown").with_workspace_root("/ws");
        let mut edit = WorkspaceEdit::new();
        let cancel = CancellationToken::new();
        let mut ctx = UploadContext {
            document: &doc,
            edit: &mut edit,
            progress: &NoProgress,
            cancel: &cancel,
        };

        let file = ResourceFile::new("a", "image/png", "png", vec![1, 2]);
        let result = uploader.upload_file(&file, &mut ctx).await.unwrap();

        assert_eq!(result.uri, "assets/a.png");
        assert!(result.undo.is_none());
        assert_eq!(edit.created_files.len(), 1);
        assert_eq!(edit.created_files[0].path, PathBuf::from("/ws/assets/a.png"));
        assert_eq!(edit.created_files[0].data, vec![1, 2]);
    }

    #[tokio::test]
    async fn document_outside_workspace_fails() {
        let uploader = WorkspaceUploader::new(WorkspaceSettings::default());
        let doc = DocumentRef::new("/tmp/scratch.md", "markdown");
        let mut edit = WorkspaceEdit::new();
        let cancel = CancellationToken::new();
        let mut ctx = UploadContext {
            document: &doc,
            edit: &mut edit,
            progress: &NoProgress,
            cancel: &cancel,
        };

        let file = ResourceFile::new("a", "image/png", "png", vec![1]);
        assert!(matches!(
            uploader.upload_file(&file, &mut ctx).await,
            Err(UploadError::NoWorkspace(_))
        ));
        assert!(edit.is_empty());
    }
}
