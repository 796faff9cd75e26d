//! Upload destinations.
//!
//! - [`ObjectStoreUploader`]: S3-compatible buckets through OpenDAL
//! - [`WorkspaceUploader`]: files created next to the document
//! - [`Uploader`]: fingerprint cache in front of either destination

mod object_store;
mod template;
mod types;
mod uploader;
mod workspace;

pub use object_store::{
    MULTIPART_CHUNK, ObjectStoreUploader, PROTECTED_CLIENT_OPTIONS, TEST_OBJECT_NAME, WRITE_SLICE,
};
pub use template::TemplateVars;
pub use types::{
    CreatedFile, DestinationKind, DocumentRef, UndoAction, UploadContext, UploadResult,
    WorkspaceEdit,
};
pub use uploader::{Destination, Uploader};
pub use workspace::WorkspaceUploader;
