//! Command implementations for the pasteup CLI.

pub mod cache;
pub mod completions;
pub mod connection;
pub mod paste;
pub mod undo;

pub use cache::run_cache_clear;
pub use completions::generate_completions;
pub use connection::run_test_connection;
pub use paste::{PasteArgs, run_paste};
pub use undo::run_undo;
