//! Shell completion scripts

use anyhow::Result;
use clap::CommandFactory;
use std::io::Write;

/// Write the completion script for `shell` to `out`, named after the binary.
pub fn write(shell: clap_complete::Shell, out: &mut impl Write) -> Result<()> {
    let mut cmd = crate::Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, out);
    out.flush()?;
    Ok(())
}
