//! Command implementations

mod matrix;
mod run;
mod validate;

use crate::cli::{Cli, Commands};
use crate::errors;
use crate::output::OutputWriter;
use anyhow::Result;
use valcheck_core::config::parse_mode;
use valcheck_core::models::Mode;

/// Execute a CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Run(args) => run::execute(args, config, &output, cli.dry_run),
        Commands::Validate(args) => validate::execute(args, config, &output),
        Commands::Matrix(args) => matrix::execute(args, config, &output),
    }
}

/// Parse an optional `--mode` value into a user-facing error
fn mode_arg(value: Option<&str>) -> Result<Option<Mode>> {
    match value {
        Some(value) => match parse_mode(value) {
            Ok(mode) => Ok(Some(mode)),
            Err(_) => Err(errors::invalid_mode(value).into()),
        },
        None => Ok(None),
    }
}
