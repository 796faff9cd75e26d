//! Upload error taxonomy.

/// Errors raised while constructing or using an upload destination.
///
/// A missing object during an existence probe is not an error: probes return
/// `Ok(false)`. A user declining a prompt is not an error either; the loader
/// returns an empty batch instead.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Required destination settings are missing or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// User-supplied client options were malformed or touched protected keys.
    #[error("Invalid client options: {0}")]
    Validation(String),

    /// The sink was unreachable or rejected the operation.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// The user aborted a long-running transfer.
    #[error("Upload cancelled")]
    Cancelled,

    /// The target document is not inside any workspace folder.
    #[error("No workspace folder contains {0}")]
    NoWorkspace(String),
}

impl UploadError {
    pub fn delivery(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Delivery(format!("{context}: {err}"))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
