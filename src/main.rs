use anyhow::{Context, Result};
use clap::Parser;
use std::env;

mod cli;

use cli::{execute_command, normalize_legacy_flags, Cli};

fn main() -> Result<()> {
    // Parse command line arguments, accepting the older single-dash flags
    let cli = Cli::parse_from(normalize_legacy_flags(env::args()));

    // Run the task and print its report
    execute_command(&cli).with_context(|| "command execution failed")
}
