//! Undo of previous uploads.

use anyhow::Result;
use inquire::Select;
use tracing::instrument;

use crate::context::AppContext;

/// List the history, or undo entry `index` (prompting when omitted).
#[instrument(skip_all, name = "undo", fields(index = ?index))]
pub async fn run_undo(ctx: &AppContext, index: Option<usize>, list: bool) -> Result<bool> {
    let entries = ctx.orchestrator.undo_entries();
    if entries.is_empty() {
        ctx.out.info("Nothing to undo.");
        return Ok(true);
    }

    if list {
        for (i, entry) in entries.iter().enumerate() {
            ctx.out.history_item(i, &entry.title);
        }
        return Ok(true);
    }

    let index = match index {
        Some(index) => index,
        None => {
            let titles: Vec<String> = entries.iter().map(|entry| entry.title.clone()).collect();
            let Some(index) = Select::new("Undo which upload?", titles)
                .raw_prompt_skippable()?
                .map(|choice| choice.index)
            else {
                return Ok(true);
            };
            index
        }
    };

    Ok(ctx.orchestrator.run_undo(index, &ctx.interaction).await)
}
