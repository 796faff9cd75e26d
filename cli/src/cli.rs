use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "pasteup")]
#[command(about = "Upload pasted or dropped files and insert links into documents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, short = 'c', global = true, env = "PASTEUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Answer yes to every confirmation
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Show timing/latency information
    #[arg(long, global = true)]
    pub timing: bool,

    /// Enable verbose debug output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload the clipboard (or the given files) and insert links into a document
    Paste {
        /// Document receiving the links
        document: PathBuf,

        /// Language id used to pick settings (inferred from the extension)
        #[arg(long, short = 'l')]
        language: Option<String>,

        /// Workspace root (defaults to the nearest ancestor with a `.git` directory)
        #[arg(long, short = 'w')]
        workspace: Option<PathBuf>,

        /// Byte offset to insert at (defaults to the end of the document)
        #[arg(long, short = 'a')]
        at: Option<usize>,

        /// Drop these files instead of reading the clipboard
        #[arg(long, short = 'f')]
        file: Vec<PathBuf>,

        /// Drop these URLs instead of reading the clipboard
        #[arg(long, short = 'u')]
        url: Vec<String>,

        /// Print the snippet instead of editing the document
        #[arg(long)]
        print: bool,
    },
    /// Upload and delete a test object to verify the object store settings
    TestConnection,
    /// Manage the upload cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Revert a previous upload
    Undo {
        /// Entry to undo, 0 being the most recent (prompts when omitted)
        index: Option<usize>,

        /// List the history instead of undoing
        #[arg(long)]
        list: bool,
    },
    /// Print the path of the settings file in use
    ConfigPath,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Forget every cached upload
    Clear,
}
