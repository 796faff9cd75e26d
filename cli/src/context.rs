//! Shared state for one CLI invocation.

use std::io::IsTerminal as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use pasteup_business::Orchestrator;
use pasteup_services::{JsonFileStateStore, StateStore, is_first_run};
use tracing::debug;

use crate::cli::Cli;
use crate::config;
use crate::interaction::{TerminalInteraction, TerminalProgress};
use crate::output::Output;

pub struct AppContext {
    pub orchestrator: Orchestrator,
    pub settings_path: PathBuf,
    pub interaction: TerminalInteraction,
    pub progress: TerminalProgress,
    pub out: Output,
}

impl AppContext {
    /// Load settings and persisted state, announcing a first run.
    pub fn load(cli: &Cli) -> Result<Self> {
        let settings_path = config::settings_path(cli.config.as_deref())?;
        let settings = config::load_settings(&settings_path)?;
        let state_path = config::state_path()?;
        debug!(settings = %settings_path.display(), state = %state_path.display(), "loading");

        let store: Arc<dyn StateStore> = Arc::new(JsonFileStateStore::open(state_path));
        let out = Output::new();
        if is_first_run(store.as_ref(), env!("CARGO_PKG_VERSION")) {
            out.info(format!(
                "pasteup {} is ready. Settings are read from {}",
                env!("CARGO_PKG_VERSION"),
                settings_path.display()
            ));
        }

        Ok(Self {
            orchestrator: Orchestrator::new(settings, store),
            settings_path,
            interaction: TerminalInteraction::new(cli.yes, std::io::stdin().is_terminal()),
            progress: TerminalProgress::default(),
            out,
        })
    }
}
