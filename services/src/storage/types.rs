//! Upload request and result types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::ObjectStoreSettings;
use crate::progress::ProgressReporter;

/// Which sink an upload goes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DestinationKind {
    #[default]
    ObjectStore,
    Workspace,
}

impl DestinationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ObjectStore => "objectStore",
            Self::Workspace => "workspace",
        }
    }
}

impl std::fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reversible effect of an upload, interpreted by the uploader that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UndoAction {
    /// Delete an object from the bucket it was written to.
    #[serde(rename_all = "camelCase")]
    DeleteObject {
        #[serde(default)]
        bucket: String,
        #[serde(default)]
        region: String,
        #[serde(default)]
        endpoint: String,
        key: String,
    },
}

impl UndoAction {
    /// Deletion of `key` from the bucket `settings` address.
    pub fn delete_object(settings: &ObjectStoreSettings, key: impl Into<String>) -> Self {
        Self::DeleteObject {
            bucket: settings.bucket.clone(),
            region: settings.region.clone(),
            endpoint: settings.endpoint.clone(),
            key: key.into(),
        }
    }
}

/// Outcome of uploading one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub uri: String,
    pub undo_title: Option<String>,
    pub undo: Option<UndoAction>,
    pub is_cache_hit: bool,
}

impl UploadResult {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            undo_title: None,
            undo: None,
            is_cache_hit: false,
        }
    }

    pub fn with_undo(mut self, title: impl Into<String>, action: UndoAction) -> Self {
        self.undo_title = Some(title.into());
        self.undo = Some(action);
        self
    }

    pub fn cache_hit(uri: impl Into<String>) -> Self {
        Self {
            is_cache_hit: true,
            ..Self::new(uri)
        }
    }
}

/// The document a paste or drop targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub path: PathBuf,
    pub language: String,
    /// Workspace folder containing the document, if any.
    pub workspace_root: Option<PathBuf>,
}

impl DocumentRef {
    pub fn new(path: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            workspace_root: None,
        }
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Document filename without its extension.
    pub fn basename(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn is_in_workspace(&self, path: &Path) -> bool {
        self.workspace_root
            .as_deref()
            .is_some_and(|root| path.starts_with(root))
    }
}

/// A file the host should create as part of the combined edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedFile {
    pub path: PathBuf,
    pub data: Vec<u8>,
    pub overwrite: bool,
}

/// File operations collected during one interaction, applied by the host at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceEdit {
    pub created_files: Vec<CreatedFile>,
}

impl WorkspaceEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_file(&mut self, path: PathBuf, data: Vec<u8>) {
        self.created_files.push(CreatedFile {
            path,
            data,
            overwrite: true,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.created_files.is_empty()
    }
}

/// Per-call collaborators for an upload.
pub struct UploadContext<'a> {
    pub document: &'a DocumentRef,
    pub edit: &'a mut WorkspaceEdit,
    pub progress: &'a dyn ProgressReporter,
    pub cancel: &'a CancellationToken,
}
