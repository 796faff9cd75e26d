//! Per-interaction upload orchestration.
//!
//! The orchestrator owns the settings snapshot, the loaders and uploaders
//! built from it, and the undo history. Loaders are cached per language and
//! uploaders per destination until [`Orchestrator::reconfigure`] discards them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use pasteup_input::RawPayload;
use pasteup_services::{
    Destination, DestinationKind, DocumentRef, Hasher, ObjectStoreSettings, ObjectStoreUploader,
    ProgressReporter, StateStore, UndoAction, UploadCache, UploadContext, UploadError, UploadResult,
    Uploader, WorkspaceEdit, WorkspaceUploader,
};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::fetch::Fetcher;
use crate::interaction::Interaction;
use crate::loader::{LoaderContext, ResourceLoader};
use crate::snippet::generate_snippet;
use crate::undo::{UndoEntry, UndoHistory};

/// Builds the object-store uploader from its settings.
pub type ObjectStoreFactory =
    Arc<dyn Fn(ObjectStoreSettings) -> Result<ObjectStoreUploader, UploadError> + Send + Sync>;

/// Result of one paste or drop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteOutcome {
    /// Snippets of every successful upload, space-joined in input order.
    pub snippet: String,
    /// Files the host must create along with the text change.
    pub edit: WorkspaceEdit,
    pub uploads: Vec<UploadResult>,
    pub failures: usize,
}

/// Host collaborators for one interaction.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    pub document: &'a DocumentRef,
    pub interaction: &'a dyn Interaction,
    pub progress: &'a dyn ProgressReporter,
    pub cancel: &'a CancellationToken,
}

pub struct Orchestrator {
    settings: Mutex<Arc<Settings>>,
    store: Arc<dyn StateStore>,
    hasher: Arc<Hasher>,
    cache: Arc<UploadCache>,
    fetcher: Fetcher,
    object_store_factory: ObjectStoreFactory,
    loaders: Mutex<HashMap<String, Arc<ResourceLoader>>>,
    uploaders: Mutex<HashMap<DestinationKind, Arc<Uploader>>>,
    undo: Mutex<UndoHistory>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(settings: Settings, store: Arc<dyn StateStore>) -> Self {
        let undo = UndoHistory::load(store.as_ref(), settings.undo_limit);
        let cache = Arc::new(UploadCache::new(Arc::clone(&store)));
        Self {
            settings: Mutex::new(Arc::new(settings)),
            store,
            hasher: Arc::new(Hasher::new()),
            cache,
            fetcher: Fetcher::new(),
            object_store_factory: Arc::new(|settings: ObjectStoreSettings| {
                ObjectStoreUploader::new(settings.with_env_fallback())
            }),
            loaders: Mutex::new(HashMap::new()),
            uploaders: Mutex::new(HashMap::new()),
            undo: Mutex::new(undo),
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<Hasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_object_store_factory(mut self, factory: ObjectStoreFactory) -> Self {
        self.object_store_factory = factory;
        self
    }

    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in new settings, discarding every cached loader and uploader.
    pub fn reconfigure(&self, settings: Settings) {
        let undo_limit = settings.undo_limit;
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(settings);
        self.loaders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.uploaders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let mut undo = self.undo.lock().unwrap_or_else(PoisonError::into_inner);
        undo.set_limit(undo_limit);
        undo.save(self.store.as_ref());
        info!("Orchestrator: settings reloaded");
    }

    /// Resolve, upload and build the replacement text for one payload.
    ///
    /// `None` when nothing was uploaded. Per-file failures are reported
    /// through the interaction and do not stop the remaining files.
    pub async fn handle_paste(&self, payload: &RawPayload, session: Session<'_>) -> Option<PasteOutcome> {
        let settings = self.settings();
        let scope = settings.scope(&session.document.language);

        let loader = self.loader(&session.document.language);
        let files = loader
            .prepare_files_to_upload(
                payload,
                LoaderContext {
                    document: session.document,
                    interaction: session.interaction,
                    progress: session.progress,
                    cancel: session.cancel,
                },
            )
            .await;
        if files.is_empty() {
            return None;
        }

        let uploader = match self.uploader(scope.upload_destination, session.interaction) {
            Ok(uploader) => uploader,
            Err(err) => {
                session.interaction.error(&err.to_string());
                return None;
            }
        };

        let mut outcome = PasteOutcome::default();
        let mut snippets = Vec::with_capacity(files.len());
        let mut ctx = UploadContext {
            document: session.document,
            edit: &mut outcome.edit,
            progress: session.progress,
            cancel: session.cancel,
        };

        for file in &files {
            match uploader.upload_file(file, &mut ctx).await {
                Ok(result) => {
                    snippets.push(generate_snippet(&scope, file, &result.uri));
                    if let (Some(title), Some(action)) = (&result.undo_title, &result.undo) {
                        self.record_undo(UndoEntry {
                            title: title.clone(),
                            action: action.clone(),
                        });
                    }
                    outcome.uploads.push(result);
                }
                Err(UploadError::Cancelled) => {
                    session
                        .interaction
                        .info(&format!("Upload of {} cancelled.", file.filename()));
                    outcome.failures += 1;
                    break;
                }
                Err(err) => {
                    session
                        .interaction
                        .error(&format!("Failed to upload {}: {err}", file.filename()));
                    outcome.failures += 1;
                }
            }
        }

        if snippets.is_empty() {
            return None;
        }
        outcome.snippet = snippets.join(" ");
        Some(outcome)
    }

    /// Undo history, most recent first.
    pub fn undo_entries(&self) -> Vec<UndoEntry> {
        self.undo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recent_first()
            .cloned()
            .collect()
    }

    /// Run and remove the entry at `index` (most recent first).
    ///
    /// A failed undo is reported and not re-queued.
    pub async fn run_undo(&self, index: usize, interaction: &dyn Interaction) -> bool {
        let entry = {
            let mut undo = self.undo.lock().unwrap_or_else(PoisonError::into_inner);
            let entry = undo.take(index);
            undo.save(self.store.as_ref());
            entry
        };
        let Some(entry) = entry else {
            interaction.warn("Nothing to undo.");
            return false;
        };

        let result = self.undo_action(&entry.action, interaction).await;

        match result {
            Ok(()) => {
                interaction.info(&format!("Undone: {}", entry.title));
                true
            }
            Err(err) => {
                interaction.error(&format!("Undo failed for {}: {err}", entry.title));
                false
            }
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Orchestrator: upload cache cleared");
    }

    /// Upload and delete a small object through the configured object store.
    pub async fn test_connection(&self) -> Result<String, UploadError> {
        let settings = self.settings();
        let uploader = (self.object_store_factory)(settings.object_store.clone())?;
        uploader.test_connection().await
    }

    /// Run `action` against the bucket it was recorded for, which may differ
    /// from the one configured now.
    async fn undo_action(
        &self,
        action: &UndoAction,
        interaction: &dyn Interaction,
    ) -> Result<(), UploadError> {
        let UndoAction::DeleteObject {
            bucket,
            region,
            endpoint,
            ..
        } = action;

        let current = match self.uploader(DestinationKind::ObjectStore, interaction) {
            Ok(uploader) => match uploader.destination() {
                Destination::ObjectStore(store) => Some(store.clone()),
                Destination::Workspace(_) => None,
            },
            Err(err) => {
                debug!("Orchestrator: configured object store unusable for undo: {err}");
                None
            }
        };

        let base = match current {
            Some(store) if store.settings().is_location(bucket, region, endpoint) => {
                return store.undo(action).await;
            }
            Some(store) => store.settings().clone(),
            None => self.settings().object_store.clone(),
        };

        info!("Orchestrator: undoing against recorded bucket '{bucket}'");
        let store = (self.object_store_factory)(base.relocated(bucket, region, endpoint))?;
        store.undo(action).await
    }

    fn record_undo(&self, entry: UndoEntry) {
        let mut undo = self.undo.lock().unwrap_or_else(PoisonError::into_inner);
        undo.push(entry);
        undo.save(self.store.as_ref());
    }

    fn loader(&self, language: &str) -> Arc<ResourceLoader> {
        let mut loaders = self.loaders.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(loader) = loaders.get(language) {
            return Arc::clone(loader);
        }

        debug!("Orchestrator: building loader for '{language}'");
        let loader = Arc::new(
            ResourceLoader::new(self.settings().scope(language), Arc::clone(&self.hasher))
                .with_fetcher(self.fetcher.clone()),
        );
        loaders.insert(language.to_owned(), Arc::clone(&loader));
        loader
    }

    fn uploader(
        &self,
        kind: DestinationKind,
        interaction: &dyn Interaction,
    ) -> Result<Arc<Uploader>, UploadError> {
        let mut uploaders = self.uploaders.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(uploader) = uploaders.get(&kind) {
            return Ok(Arc::clone(uploader));
        }

        debug!("Orchestrator: building {kind} uploader");
        let settings = self.settings();
        let destination = match kind {
            DestinationKind::ObjectStore => {
                let store = (self.object_store_factory)(settings.object_store.clone())?;
                for warning in store.warnings() {
                    warn!("Orchestrator: {warning}");
                    interaction.warn(warning);
                }
                Destination::ObjectStore(store)
            }
            DestinationKind::Workspace => {
                Destination::Workspace(WorkspaceUploader::new(settings.workspace.clone()))
            }
        };

        let uploader = Arc::new(Uploader::new(
            destination,
            Arc::clone(&self.hasher),
            Arc::clone(&self.cache),
        ));
        uploaders.insert(kind, Arc::clone(&uploader));
        Ok(uploader)
    }
}
