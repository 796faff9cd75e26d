//! Object store connectivity check.

use anyhow::Result;
use tracing::instrument;

use crate::context::AppContext;

/// Write and delete a small object; `Ok(false)` when the store rejects it.
#[instrument(skip_all, name = "test_connection")]
pub async fn run_test_connection(ctx: &AppContext) -> Result<bool> {
    let settings = ctx.orchestrator.settings();
    ctx.out.dim(format!(
        "Testing bucket '{}' ({})",
        settings.object_store.bucket,
        if settings.object_store.endpoint.is_empty() {
            "AWS"
        } else {
            settings.object_store.endpoint.as_str()
        }
    ));

    match ctx.orchestrator.test_connection().await {
        Ok(key) => {
            ctx.out.success(format!("Uploaded and deleted {key}"));
            Ok(true)
        }
        Err(err) => {
            ctx.out.error(format!("Connection test failed: {err}"));
            Ok(false)
        }
    }
}
