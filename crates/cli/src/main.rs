//! gsmcreds CLI binary

#![allow(clippy::print_stderr)]

use gsmcreds_cli::cli::{self, EXIT_OK, exit_code_for, render_error};
use gsmcreds_cli::tracing::{TracingConfig, TracingFormat};

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    // hyper-rustls may see more than one crypto backend; pin ring
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = cli::parse();
    let json = cli.json;

    let tracing_config = TracingConfig {
        format: if json {
            TracingFormat::Json
        } else {
            TracingFormat::Compact
        },
        level: cli.level.into(),
        ..Default::default()
    };
    if let Err(e) = gsmcreds_cli::tracing::init_tracing(tracing_config) {
        eprintln!("{e:?}");
    }

    let exit_code = match gsmcreds_cli::run(cli).await {
        Ok(()) => EXIT_OK,
        Err(err) => {
            render_error(&err, json);
            exit_code_for(&err)
        }
    };
    std::process::exit(exit_code);
}
