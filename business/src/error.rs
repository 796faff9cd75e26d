use std::path::PathBuf;

/// Errors inside the resource loader.
///
/// These never escape [`ResourceLoader::prepare_files_to_upload`](crate::ResourceLoader::prepare_files_to_upload),
/// which reports them and returns an empty batch.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("Cancelled")]
    Cancelled,

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoaderError {
    pub fn fetch(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.to_owned(),
            reason: reason.to_string(),
        }
    }
}
