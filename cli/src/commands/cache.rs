use tracing::instrument;

use crate::context::AppContext;

#[instrument(skip_all, name = "cache_clear")]
pub fn run_cache_clear(ctx: &AppContext) {
    ctx.orchestrator.clear_cache();
    ctx.out.success("Upload cache cleared");
}
