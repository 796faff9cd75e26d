//! Pipeline settings.
//!
//! [`Settings`] is the whole configuration document. Per-language overrides
//! are layered over `general` by [`Settings::scope`], which yields the
//! immutable [`ScopeSettings`] snapshot a loader is built from.

use std::collections::HashMap;

use log::warn;
use pasteup_services::{DestinationKind, ObjectStoreSettings, WorkspaceSettings};
use serde::{Deserialize, Serialize};

/// Default number of undo entries kept.
pub const DEFAULT_UNDO_LIMIT: usize = 20;

/// How a file's MIME type is determined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MimeDetection {
    /// Trust the payload; no lookup.
    None,
    /// Cross-fill MIME and extension through the lookup table.
    Extension,
    /// Sniff magic bytes, then cross-fill.
    #[default]
    Content,
}

/// When to replace the original filename.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilenamePolicy {
    /// Generate only when the name is missing or a generic placeholder.
    #[default]
    KeepOriginal,
    AlwaysGenerate,
}

/// How generated names are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NamingMethod {
    #[default]
    ContentHash,
    ContentHashShort,
    Uuid,
    Nanoid,
    Timestamp,
    IsoDate,
    Prompt,
}

/// What to do when a payload holds more than one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MultiFilePolicy {
    Allow,
    #[default]
    Prompt,
    Deny,
}

/// Settings for one scope (a document language, or the general fallback).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScopeSettings {
    pub enabled: bool,
    pub upload_destination: DestinationKind,
    /// Total batch size limit in MiB. Zero or negative disables the check.
    pub file_size_limit: i64,
    pub mime_type_detection_method: MimeDetection,
    pub file_naming_policy: FilenamePolicy,
    pub file_naming_method: NamingMethod,
    pub default_snippet: String,
    pub image_snippet: String,
    pub multi_file_policy: MultiFilePolicy,
    /// Case-insensitive regex over MIME types. Empty accepts everything.
    pub mime_type_filter: String,
    pub ignore_workspace_files: bool,
    pub retrieve_original_image: bool,
}

impl Default for ScopeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            upload_destination: DestinationKind::ObjectStore,
            file_size_limit: 10,
            mime_type_detection_method: MimeDetection::Content,
            file_naming_policy: FilenamePolicy::KeepOriginal,
            file_naming_method: NamingMethod::ContentHash,
            default_snippet: "[${filename}](${url})".to_owned(),
            image_snippet: "![${filenameWithoutExtension}](${url})".to_owned(),
            multi_file_policy: MultiFilePolicy::Prompt,
            mime_type_filter: String::new(),
            ignore_workspace_files: true,
            retrieve_original_image: false,
        }
    }
}

impl ScopeSettings {
    /// Size limit in bytes, if the check is enabled.
    pub fn size_limit_bytes(&self) -> Option<u64> {
        u64::try_from(self.file_size_limit)
            .ok()
            .filter(|mib| *mib > 0)
            .map(|mib| mib.saturating_mul(1024 * 1024))
    }
}

/// The complete configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub general: ScopeSettings,
    /// Partial scope settings keyed by language id. Each present key replaces
    /// the `general` value.
    pub languages: HashMap<String, serde_json::Map<String, serde_json::Value>>,
    pub object_store: ObjectStoreSettings,
    pub workspace: WorkspaceSettings,
    pub undo_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: ScopeSettings::default(),
            languages: HashMap::new(),
            object_store: ObjectStoreSettings::default(),
            workspace: WorkspaceSettings::default(),
            undo_limit: DEFAULT_UNDO_LIMIT,
        }
    }
}

impl Settings {
    /// Resolve the settings snapshot for `language`.
    pub fn scope(&self, language: &str) -> ScopeSettings {
        let Some(overrides) = self.languages.get(language) else {
            return self.general.clone();
        };

        let merged = serde_json::to_value(&self.general).and_then(|mut base| {
            if let serde_json::Value::Object(fields) = &mut base {
                for (key, value) in overrides {
                    fields.insert(key.clone(), value.clone());
                }
            }
            serde_json::from_value(base)
        });

        merged.unwrap_or_else(|err| {
            warn!("Settings: invalid overrides for language '{language}': {err}");
            self.general.clone()
        })
    }
}
