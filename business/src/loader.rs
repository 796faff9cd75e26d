//! Turns a paste/drop payload into upload-ready files.
//!
//! # Steps
//!
//! 1. Bail out when the scope is disabled
//! 2. Extract candidates: attachments first, else the `text/uri-list` part
//! 3. Complete each candidate's name, MIME type and extension
//! 4. Make names unique within the batch
//! 5. Apply the MIME filter
//! 6. Apply the multi-file policy
//! 7. Optionally swap in the original image referenced by the HTML part
//! 8. Confirm batches over the size limit
//!
//! Declined prompts and loader errors yield an empty batch, never an error.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};
use pasteup_input::{
    IncompleteFile, OCTET_STREAM, RawPayload, ResourceFile, UriTarget, classify_uri,
    find_image_source, parse_uri_list, split_filename, url_filename,
};
use pasteup_services::{DocumentRef, Hasher, ProgressReporter};
use regex::{Regex, RegexBuilder};
use tokio_util::sync::CancellationToken;

use crate::config::{FilenamePolicy, MimeDetection, MultiFilePolicy, ScopeSettings};
use crate::error::LoaderError;
use crate::fetch::Fetcher;
use crate::interaction::Interaction;
use crate::mime::{extension_from_mime, mime_from_extension, sniff};
use crate::naming::{PLACEHOLDER_NAME, generate_name};

/// Per-call collaborators for loading.
#[derive(Clone, Copy)]
pub struct LoaderContext<'a> {
    pub document: &'a DocumentRef,
    pub interaction: &'a dyn Interaction,
    pub progress: &'a dyn ProgressReporter,
    pub cancel: &'a CancellationToken,
}

/// Resolves payloads for one scope.
#[derive(Debug)]
pub struct ResourceLoader {
    settings: ScopeSettings,
    mime_filter: Option<Regex>,
    hasher: Arc<Hasher>,
    fetcher: Fetcher,
}

impl ResourceLoader {
    pub fn new(settings: ScopeSettings, hasher: Arc<Hasher>) -> Self {
        let mime_filter = compile_filter(&settings.mime_type_filter);
        Self {
            settings,
            mime_filter,
            hasher,
            fetcher: Fetcher::new(),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn settings(&self) -> &ScopeSettings {
        &self.settings
    }

    /// Files to upload for `payload`, possibly none.
    pub async fn prepare_files_to_upload(
        &self,
        payload: &RawPayload,
        ctx: LoaderContext<'_>,
    ) -> Vec<ResourceFile> {
        match self.prepare(payload, ctx).await {
            Ok(files) => files,
            Err(LoaderError::Cancelled) => {
                info!("ResourceLoader: cancelled");
                Vec::new()
            }
            Err(err) => {
                ctx.interaction.error(&err.to_string());
                Vec::new()
            }
        }
    }

    async fn prepare(
        &self,
        payload: &RawPayload,
        ctx: LoaderContext<'_>,
    ) -> Result<Vec<ResourceFile>, LoaderError> {
        if !self.settings.enabled {
            debug!("ResourceLoader: disabled for this scope");
            return Ok(Vec::new());
        }

        let candidates = self.extract(payload, ctx).await?;
        if candidates.is_empty() {
            debug!("ResourceLoader: no usable content in payload");
            return Ok(Vec::new());
        }

        let mut files = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if let Some(file) = self.complete(candidate, ctx).await {
                files.push(file);
            }
        }

        dedupe_names(&mut files);

        if let Some(filter) = &self.mime_filter {
            files.retain(|file| {
                let keep = filter.is_match(&file.mime);
                if !keep {
                    debug!("ResourceLoader: {} ({}) filtered out", file.filename(), file.mime);
                }
                keep
            });
        }

        if files.len() > 1 {
            match self.settings.multi_file_policy {
                MultiFilePolicy::Allow => {}
                MultiFilePolicy::Deny => {
                    ctx.interaction.warn(&format!(
                        "Pasting {} files at once is disabled for this document type.",
                        files.len()
                    ));
                    return Ok(Vec::new());
                }
                MultiFilePolicy::Prompt => {
                    if !ctx
                        .interaction
                        .confirm(&format!("Upload {} files?", files.len()))
                    {
                        return Ok(Vec::new());
                    }
                }
            }
        }

        if self.settings.retrieve_original_image
            && let Some(html) = payload.html()
            && let Some(src) = find_image_source(html)
        {
            match self.retrieve_original(&src, &files, ctx).await {
                Ok(Some(original)) => files = vec![original],
                Ok(None) => {}
                Err(LoaderError::Cancelled) => {
                    info!("ResourceLoader: original image retrieval cancelled");
                }
                Err(err) => ctx.interaction.warn(&format!(
                    "Could not retrieve the original image, animated content may be lost. {err}"
                )),
            }
        }

        if let Some(limit) = self.settings.size_limit_bytes() {
            let total: u64 = files
                .iter()
                .map(|f| u64::try_from(f.len()).unwrap_or(u64::MAX))
                .sum();
            if total > limit
                && !ctx.interaction.confirm(&format!(
                    "The files total {}, over the {} MiB limit. Upload anyway?",
                    human_size(total),
                    self.settings.file_size_limit
                ))
            {
                return Ok(Vec::new());
            }
        }

        Ok(files)
    }

    async fn extract(
        &self,
        payload: &RawPayload,
        ctx: LoaderContext<'_>,
    ) -> Result<Vec<IncompleteFile>, LoaderError> {
        let attachments: Vec<IncompleteFile> = payload
            .attachments()
            .map(|a| IncompleteFile::from_filename(a.filename, a.bytes.to_vec()).with_mime(a.mime_hint))
            .collect();
        if !attachments.is_empty() {
            return Ok(attachments);
        }

        let Some(list) = payload.uri_list() else {
            return Ok(Vec::new());
        };

        let mut files = Vec::new();
        for uri in parse_uri_list(list) {
            match classify_uri(&uri) {
                Some(UriTarget::Local(path)) => {
                    if self.settings.ignore_workspace_files && ctx.document.is_in_workspace(&path) {
                        debug!("ResourceLoader: skipping workspace file {}", path.display());
                        continue;
                    }
                    match read_local(&path).await {
                        Ok(file) => files.push(file),
                        Err(err) => warn!("ResourceLoader: skipping {uri}: {err}"),
                    }
                }
                Some(UriTarget::Remote(url)) => {
                    match self.fetcher.download(&url, ctx.progress, ctx.cancel).await {
                        Ok(downloaded) => {
                            let name = url_filename(&url).unwrap_or_default();
                            let mut file = IncompleteFile::from_filename(&name, downloaded.data);
                            if let Some(content_type) = downloaded.content_type {
                                file = file.with_mime(content_type);
                            }
                            files.push(file);
                        }
                        Err(LoaderError::Cancelled) => return Err(LoaderError::Cancelled),
                        Err(err) => warn!("ResourceLoader: skipping {uri}: {err}"),
                    }
                }
                None => debug!("ResourceLoader: ignoring unsupported uri {uri}"),
            }
        }
        Ok(files)
    }

    /// Fill in name, MIME type and extension. `None` drops the candidate.
    async fn complete(&self, mut file: IncompleteFile, ctx: LoaderContext<'_>) -> Option<ResourceFile> {
        let placeholder = file
            .name
            .as_deref()
            .is_none_or(|name| name.is_empty() || name == PLACEHOLDER_NAME);
        if placeholder || self.settings.file_naming_policy == FilenamePolicy::AlwaysGenerate {
            let generated = generate_name(
                self.settings.file_naming_method,
                &file.data,
                file.name.as_deref(),
                &self.hasher,
                ctx.interaction,
            )
            .await;
            let Some(generated) = generated else {
                debug!("ResourceLoader: candidate dropped without a name");
                return None;
            };
            let (name, extension) = split_filename(&generated);
            file.name = name;
            if file.extension.is_none() {
                file.extension = extension;
            }
        }

        if file.mime.as_deref() == Some(OCTET_STREAM) {
            file.mime = None;
        }

        let detection = self.settings.mime_type_detection_method;
        if detection == MimeDetection::Content
            && let Some(sniffed) = sniff(&file.data)
        {
            file.mime = Some(sniffed.to_owned());
        }

        if detection != MimeDetection::None {
            if file.mime.is_none()
                && let Some(extension) = file.extension.as_deref()
            {
                file.mime = mime_from_extension(extension);
            }
            if file.extension.is_none()
                && let Some(mime) = file.mime.as_deref()
            {
                file.extension = extension_from_mime(mime);
            }
        }

        file.complete()
    }

    async fn retrieve_original(
        &self,
        src: &str,
        prepared: &[ResourceFile],
        ctx: LoaderContext<'_>,
    ) -> Result<Option<ResourceFile>, LoaderError> {
        let Some(UriTarget::Remote(url)) = classify_uri(src) else {
            debug!("ResourceLoader: image source {src} is not remote");
            return Ok(None);
        };

        let content_type = self.fetcher.content_type(&url).await?;
        if let Some(content_type) = &content_type
            && prepared.iter().any(|file| &file.mime == content_type)
        {
            debug!("ResourceLoader: original {content_type} already present");
            return Ok(None);
        }

        let downloaded = self.fetcher.download(&url, ctx.progress, ctx.cancel).await?;
        let name = url_filename(&url).unwrap_or_default();
        let mut candidate = IncompleteFile::from_filename(&name, downloaded.data);
        if let Some(mime) = downloaded.content_type.or(content_type) {
            candidate = candidate.with_mime(mime);
        }

        Ok(self.complete(candidate, ctx).await)
    }
}

fn compile_filter(pattern: &str) -> Option<Regex> {
    if pattern.trim().is_empty() {
        return None;
    }
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(err) => {
            warn!("ResourceLoader: ignoring invalid MIME filter '{pattern}': {err}");
            None
        }
    }
}

async fn read_local(path: &Path) -> Result<IncompleteFile, LoaderError> {
    let io_err = |source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    };

    let metadata = tokio::fs::metadata(path).await.map_err(io_err)?;
    if !metadata.is_file() {
        return Err(io_err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }

    let data = tokio::fs::read(path).await.map_err(io_err)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(IncompleteFile::from_filename(&filename, data))
}

/// Suffix `.1`, `.2`, … onto names already used in the batch.
pub fn dedupe_names(files: &mut [ResourceFile]) {
    let mut seen = HashSet::new();
    for file in files {
        if seen.insert(file.name.clone()) {
            continue;
        }
        let mut n = 1_usize;
        loop {
            let candidate = format!("{}.{n}", file.name);
            if seen.insert(candidate.clone()) {
                file.name = candidate;
                break;
            }
            n += 1;
        }
    }
}

fn human_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    }
}
