//! `pasteup`: paste or drop files into a document, uploading them first.

mod cli;
mod commands;
mod config;
mod context;
mod document;
mod interaction;
mod output;
mod timing;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser as _;

use crate::cli::{CacheAction, Cli, Commands};
use crate::commands::PasteArgs;
use crate::context::AppContext;
use crate::output::Output;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    timing::init_tracing(cli.verbose, cli.timing);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            Output::new().error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    match &cli.command {
        Commands::Completions { shell } => {
            commands::generate_completions(*shell);
            return Ok(true);
        }
        Commands::ConfigPath => {
            println!("{}", config::settings_path(cli.config.as_deref())?.display());
            return Ok(true);
        }
        _ => {}
    }

    let ctx = AppContext::load(&cli)?;
    tracing::debug!(settings = %ctx.settings_path.display(), "context ready");

    match cli.command {
        Commands::Paste {
            document,
            language,
            workspace,
            at,
            file,
            url,
            print,
        } => {
            commands::run_paste(
                &ctx,
                PasteArgs {
                    document,
                    language,
                    workspace,
                    at,
                    files: file,
                    urls: url,
                    print,
                },
            )
            .await
        }
        Commands::TestConnection => commands::run_test_connection(&ctx).await,
        Commands::Cache {
            action: CacheAction::Clear,
        } => {
            commands::run_cache_clear(&ctx);
            Ok(true)
        }
        Commands::Undo { index, list } => commands::run_undo(&ctx, index, list).await,
        Commands::ConfigPath | Commands::Completions { .. } => Ok(true),
    }
}
