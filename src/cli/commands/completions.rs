//! `secretzero completions`: shell completion scripts.
//!
//!   secretzero completions bash > ~/.bash_completion.d/secretzero

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::Result;

/// Execute the `completions` command.
pub fn execute(shell: Shell) -> Result<()> {
    let script = render(shell);
    io::stdout().write_all(&script)?;
    Ok(())
}

fn render(shell: Shell) -> Vec<u8> {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    generate(shell, &mut cmd, "secretzero", &mut buf);
    buf
}
