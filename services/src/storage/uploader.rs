//! Cache-aware upload entry point over the closed set of destinations.

use std::sync::Arc;

use pasteup_input::ResourceFile;
use tracing::{debug, instrument};

use super::object_store::ObjectStoreUploader;
use super::types::{DestinationKind, UploadContext, UploadResult};
use super::workspace::WorkspaceUploader;
use crate::cache::UploadCache;
use crate::error::UploadError;
use crate::hasher::Hasher;

/// A configured sink.
#[derive(Debug, Clone)]
pub enum Destination {
    ObjectStore(ObjectStoreUploader),
    Workspace(WorkspaceUploader),
}

impl Destination {
    pub fn kind(&self) -> DestinationKind {
        match self {
            Self::ObjectStore(_) => DestinationKind::ObjectStore,
            Self::Workspace(_) => DestinationKind::Workspace,
        }
    }

    async fn deliver(
        &self,
        file: &ResourceFile,
        ctx: &mut UploadContext<'_>,
    ) -> Result<UploadResult, UploadError> {
        match self {
            Self::ObjectStore(uploader) => uploader.upload_file(file, ctx).await,
            Self::Workspace(uploader) => uploader.upload_file(file, ctx).await,
        }
    }

    /// Cache namespace, so identical content sent to different sinks is not conflated.
    fn cache_namespace(&self, ctx: &UploadContext<'_>) -> String {
        match self {
            Self::ObjectStore(uploader) => format!("{}:{}", self.kind(), uploader.bucket()),
            Self::Workspace(_) => format!(
                "{}:{}",
                self.kind(),
                ctx.document
                    .workspace_root
                    .as_deref()
                    .map(|root| root.display().to_string())
                    .unwrap_or_default()
            ),
        }
    }
}

/// Uploads files, consulting the fingerprint cache first.
#[derive(Debug, Clone)]
pub struct Uploader {
    destination: Destination,
    hasher: Arc<Hasher>,
    cache: Arc<UploadCache>,
}

impl Uploader {
    pub fn new(destination: Destination, hasher: Arc<Hasher>, cache: Arc<UploadCache>) -> Self {
        Self {
            destination,
            hasher,
            cache,
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Upload `file`, or return the URL issued for identical content before.
    ///
    /// Cache hits carry no undo action since nothing was written.
    #[instrument(skip_all, fields(destination = %self.destination.kind(), name = %file.name))]
    pub async fn upload_file(
        &self,
        file: &ResourceFile,
        ctx: &mut UploadContext<'_>,
    ) -> Result<UploadResult, UploadError> {
        let digest = self.hasher.hash(&file.data).await;
        let fingerprint = format!("{}:{digest}", self.destination.cache_namespace(ctx));

        if let Some(url) = self.cache.get(&fingerprint) {
            debug!(target: "pasteup_services::uploader", %url, "cache hit");
            return Ok(UploadResult::cache_hit(url));
        }

        let result = self.destination.deliver(file, ctx).await?;
        self.cache.put(&fingerprint, &result.uri);
        Ok(result)
    }
}
