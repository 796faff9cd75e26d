//! `pasteup completions <shell>`.

use std::io::Write as _;

use clap::CommandFactory as _;
use clap_complete::Shell;

use crate::cli::Cli;

pub fn generate_completions(shell: Shell) {
    let mut command = Cli::command();
    let name = command.get_name().to_owned();
    let mut stdout = std::io::stdout().lock();
    clap_complete::generate(shell, &mut command, name, &mut stdout);
    drop(stdout.flush());
}
