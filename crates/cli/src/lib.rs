//! gsmcreds command line front end
//!
//! `gsmcreds list` discovers credentials and prints their summaries;
//! `gsmcreds show <id>` prints the value of one of them.

// CLI output goes to stdout/stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

/// CLI argument parsing, errors and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
/// Tracing and logging configuration.
pub mod tracing;

use crate::cli::{Cli, CliError, Commands};
use gsmcreds_gcp::GcpConnector;
use gsmcreds_secrets::{CredentialsSupplier, FileConfigSource, LayeredConfigSource};
use std::sync::Arc;

/// Build the supplier described by the command line
#[must_use]
pub fn supplier_for(cli: &Cli) -> CredentialsSupplier {
    let file = cli.config.clone().map(FileConfigSource::new);
    let config = LayeredConfigSource::new(file, cli.overrides());
    let connector = GcpConnector::with_mode(cli.mode.resolve());
    ::tracing::debug!(?connector, "Using Secret Manager connector");
    CredentialsSupplier::new(Arc::new(config), Arc::new(connector))
}

/// Run the parsed command, writing results to stdout.
///
/// # Errors
/// Returns [`CliError`] if the command fails.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let supplier = supplier_for(&cli);
    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Commands::List => commands::execute_list(&supplier, &mut stdout).await,
        Commands::Show { id } => commands::execute_show(&supplier, id, &mut stdout).await,
    }
}
