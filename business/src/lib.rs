//! Paste/drop pipeline: payload resolution, naming, snippets and orchestration.

pub mod config;
pub mod error;
pub mod fetch;
pub mod interaction;
pub mod loader;
pub mod mime;
pub mod naming;
pub mod orchestrator;
pub mod snippet;
pub mod undo;

pub use config::{
    DEFAULT_UNDO_LIMIT, FilenamePolicy, MimeDetection, MultiFilePolicy, NamingMethod,
    ScopeSettings, Settings,
};
pub use error::LoaderError;
pub use fetch::{ACCEPT_IMAGES, Downloaded, Fetcher};
pub use interaction::{Interaction, Notice, RecordingInteraction};
pub use loader::{LoaderContext, ResourceLoader, dedupe_names};
pub use naming::generate_name;
pub use orchestrator::{ObjectStoreFactory, Orchestrator, PasteOutcome, Session};
pub use snippet::generate_snippet;
pub use undo::{UNDO_HISTORY_KEY, UndoEntry, UndoHistory};
