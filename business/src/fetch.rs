//! Remote asset retrieval.

use log::{debug, info};
use pasteup_services::{DelayedProgress, ProgressReporter};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use tokio_util::sync::CancellationToken;

use crate::error::LoaderError;

/// `Accept` header favoring modern image formats.
pub const ACCEPT_IMAGES: &str = "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8";

/// A downloaded resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub data: Vec<u8>,
    /// Media type without parameters, lowercased.
    pub content_type: Option<String>,
}

/// HTTP client for remote assets.
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Content type reported by a `HEAD` request.
    pub async fn content_type(&self, url: &str) -> Result<Option<String>, LoaderError> {
        let response = self
            .client
            .head(url)
            .header(ACCEPT, ACCEPT_IMAGES)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| LoaderError::fetch(url, e))?;

        Ok(media_type(response.headers()))
    }

    /// Stream `url` into memory, reporting progress and honoring `cancel`.
    pub async fn download(
        &self,
        url: &str,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Downloaded, LoaderError> {
        info!("Fetcher: downloading {url}");
        let request = self.client.get(url).header(ACCEPT, ACCEPT_IMAGES).send();
        let mut response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LoaderError::Cancelled),
            response = request => response
                .and_then(reqwest::Response::error_for_status)
                .map_err(|e| LoaderError::fetch(url, e))?,
        };

        let content_type = media_type(response.headers());
        let total = response.content_length();
        let progress = DelayedProgress::new(progress, format!("Downloading {url}"));
        let mut data = Vec::new();

        loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    progress.finish();
                    return Err(LoaderError::Cancelled);
                }
                chunk = response.chunk() => chunk.map_err(|e| LoaderError::fetch(url, e))?,
            };
            let Some(chunk) = chunk else { break };
            data.extend_from_slice(&chunk);
            progress.advance(u64::try_from(data.len()).unwrap_or(u64::MAX), total);
        }
        progress.finish();

        debug!("Fetcher: {url} returned {} bytes ({content_type:?})", data.len());
        Ok(Downloaded { data, content_type })
    }
}

fn media_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
}
