//! Upload services for pasteup.
//!
//! - [`hasher`]: content fingerprints with external/native/reference backends
//! - [`cache`]: bounded fingerprint → URL cache over a [`StateStore`]
//! - [`state`]: persisted key-value state
//! - [`config`]: destination settings snapshots
//! - [`progress`]: progress port for long transfers
//! - [`storage`]: object store and workspace destinations behind [`Uploader`]
//! - [`error`]: [`UploadError`]

pub mod cache;
pub mod config;
pub mod error;
pub mod hasher;
pub mod progress;
pub mod state;
pub mod storage;

pub use cache::{CACHE_KEY, CacheEntry, DEFAULT_CAPACITY, UploadCache};
pub use config::{ObjectStoreSettings, WorkspaceSettings};
pub use error::UploadError;
pub use hasher::{Algorithm, HashBackend, Hasher};
pub use progress::{DelayedProgress, NoProgress, PROGRESS_DELAY, ProgressReporter};
pub use state::{
    JsonFileStateStore, MemoryStateStore, StateStore, StateStoreError, VERSION_KEY, is_first_run,
    load, save,
};
pub use storage::{
    CreatedFile, Destination, DestinationKind, DocumentRef, ObjectStoreUploader, TemplateVars,
    UndoAction, UploadContext, UploadResult, Uploader, WorkspaceEdit, WorkspaceUploader,
};
