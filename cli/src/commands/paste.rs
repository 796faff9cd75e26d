//! Paste or drop into a document.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use pasteup_business::Session;
use pasteup_input::{ClipboardProvider as _, MIME_URI_LIST, RawPayload, SystemClipboard};
use pasteup_services::DocumentRef;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::context::AppContext;
use crate::document::{
    apply_edit, apply_paste, check_offset, find_workspace_root, language_for, read_document,
};

pub struct PasteArgs {
    pub document: PathBuf,
    pub language: Option<String>,
    pub workspace: Option<PathBuf>,
    pub at: Option<usize>,
    pub files: Vec<PathBuf>,
    pub urls: Vec<String>,
    pub print: bool,
}

/// Dropped files and URLs as a `text/uri-list` payload, or `None` for the clipboard.
pub fn dropped_payload(files: &[PathBuf], urls: &[String]) -> Result<Option<RawPayload>> {
    if files.is_empty() && urls.is_empty() {
        return Ok(None);
    }

    let mut lines = Vec::with_capacity(files.len() + urls.len());
    for file in files {
        let path = std::path::absolute(file)
            .with_context(|| format!("Invalid path: {}", file.display()))?;
        lines.push(path.display().to_string());
    }
    lines.extend(urls.iter().cloned());

    Ok(Some(RawPayload::new().with_text(MIME_URI_LIST, lines.join("\r\n"))))
}

fn document_ref(args: &PasteArgs) -> Result<DocumentRef> {
    let path = std::path::absolute(&args.document)
        .with_context(|| format!("Invalid document path: {}", args.document.display()))?;
    let language = args
        .language
        .clone()
        .unwrap_or_else(|| language_for(&path));
    let root = match &args.workspace {
        Some(root) => Some(std::path::absolute(root)?),
        None => find_workspace_root(&path),
    };

    let document = DocumentRef::new(path, language);
    Ok(match root {
        Some(root) => document.with_workspace_root(root),
        None => document,
    })
}

/// Reject an insertion offset the document cannot take, before anything is uploaded.
async fn check_target(args: &PasteArgs) -> Result<()> {
    if args.print || args.at.is_none() {
        return Ok(());
    }
    let text = read_document(&args.document).await?;
    check_offset(&text, args.at)?;
    Ok(())
}

/// Returns `Ok(false)` when nothing was uploaded or some files failed.
#[instrument(skip_all, name = "paste", fields(document = %args.document.display()))]
pub async fn run_paste(ctx: &AppContext, args: PasteArgs) -> Result<bool> {
    check_target(&args).await?;

    let payload = match dropped_payload(&args.files, &args.urls)? {
        Some(payload) => payload,
        None => SystemClipboard
            .read_payload()
            .context("Failed to read the clipboard")?,
    };
    if payload.is_empty() {
        bail!("Nothing to paste: the clipboard is empty");
    }

    let document = document_ref(&args)?;
    info!(language = %document.language, "pasting");

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let outcome = ctx
        .orchestrator
        .handle_paste(
            &payload,
            Session {
                document: &document,
                interaction: &ctx.interaction,
                progress: &ctx.progress,
                cancel: &cancel,
            },
        )
        .await;
    ctrl_c.abort();

    let Some(outcome) = outcome else {
        ctx.out.warning("Nothing was uploaded.");
        return Ok(false);
    };

    if args.print {
        apply_edit(&outcome.edit).await?;
        println!("{}", outcome.snippet);
    } else {
        apply_paste(&args.document, args.at, &outcome.snippet, &outcome.edit).await?;
        ctx.out.success(format!(
            "Inserted {} link(s) into {}",
            outcome.uploads.len(),
            display_name(&args.document)
        ));
    }

    let cached = outcome.uploads.iter().filter(|u| u.is_cache_hit).count();
    if cached > 0 {
        ctx.out.dim(format!("{cached} file(s) reused from the upload cache"));
    }

    Ok(outcome.failures == 0)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}
