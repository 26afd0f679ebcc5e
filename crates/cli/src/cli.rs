use crate::tracing::LogLevel;
use clap::{Parser, Subcommand, ValueEnum};
use gsmcreds_gcp::GcpMode;
use gsmcreds_secrets::{Filter, PluginConfiguration, ScanPolicy};
use miette::{Diagnostic, Report};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Secret Manager or output error exit code
pub const EXIT_RUNTIME: i32 = 3;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("Configuration error: {message}")]
    #[diagnostic(code(gsmcreds::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Listing or reading secrets failed (exit code 3)
    #[error("Secret Manager error: {message}")]
    #[diagnostic(code(gsmcreds::cli::store))]
    Store {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Other unexpected error (exit code 3)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(gsmcreds::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new store error with help text
    #[must_use]
    pub fn store_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<gsmcreds_secrets::DiscoveryError> for CliError {
    fn from(err: gsmcreds_secrets::DiscoveryError) -> Self {
        match &err {
            gsmcreds_secrets::DiscoveryError::Config(source) => Self::config_with_help(
                source.to_string(),
                "Check the file passed with --config",
            ),
            gsmcreds_secrets::DiscoveryError::List { .. } => Self::store_with_help(
                err.to_string(),
                "Use --best-effort to skip projects or locations that cannot be listed",
            ),
        }
    }
}

impl From<gsmcreds_secrets::CredentialsUnavailable> for CliError {
    fn from(err: gsmcreds_secrets::CredentialsUnavailable) -> Self {
        Self::store_with_help(
            err.to_string(),
            "Check that the secret has an enabled version and that you can access it",
        )
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Store { .. } | CliError::Other { .. } => EXIT_RUNTIME,
    }
}

/// Render error appropriately based on JSON flag
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let envelope = serde_json::json!({
            "status": "error",
            "error": {
                "code": match err {
                    CliError::Config { .. } => "config",
                    CliError::Store { .. } => "store",
                    CliError::Other { .. } => "other",
                },
                "message": err.to_string(),
            }
        });
        println!("{envelope}");
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Transport selection for Secret Manager
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Serialize)]
pub enum ModeArg {
    /// HTTP when `GOOGLE_APPLICATION_CREDENTIALS` is set, `gcloud` otherwise
    #[default]
    Auto,
    /// Secret Manager REST API
    Http,
    /// The `gcloud` CLI
    Cli,
}

impl ModeArg {
    /// Resolve to a concrete transport
    #[must_use]
    pub fn resolve(self) -> GcpMode {
        match self {
            Self::Auto => GcpMode::detect(),
            Self::Http => GcpMode::Http,
            Self::Cli => GcpMode::Cli,
        }
    }
}

/// Command line arguments for gsmcreds.
#[derive(Parser, Debug)]
#[command(name = "gsmcreds")]
#[command(about = "Discover credentials stored as labelled secrets in Google Secret Manager")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path.
    #[arg(
        long,
        global = true,
        env = "GSMCREDS_CONFIG",
        help = "Configuration file (TOML, or JSON with a .json extension)"
    )]
    pub config: Option<PathBuf>,

    /// Project ids, overriding the file.
    #[arg(long, global = true, help = "Comma-separated project ids")]
    pub project: Option<String>,

    /// Location ids, overriding the file.
    #[arg(long, global = true, help = "Comma-separated location ids")]
    pub location: Option<String>,

    /// Client-side filter label.
    #[arg(
        long,
        global = true,
        requires = "filter_value",
        help = "Only include secrets carrying this label"
    )]
    pub filter_label: Option<String>,

    /// Client-side filter allow-list.
    #[arg(
        long,
        global = true,
        requires = "filter_label",
        help = "Comma-separated allowed values for --filter-label"
    )]
    pub filter_value: Option<String>,

    /// Server-side filter fragment.
    #[arg(long, global = true, help = "Extra list query ANDed with the type label query")]
    pub server_filter: Option<String>,

    /// Use the best-effort scan policy.
    #[arg(
        long,
        global = true,
        help = "Skip projects and locations that fail instead of aborting"
    )]
    pub best_effort: bool,

    /// Transport selection.
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Secret Manager transport"
    )]
    pub mode: ModeArg,

    /// Logging verbosity level.
    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Emit logs and errors as JSON.
    #[arg(long, global = true, help = "Output logs in JSON format")]
    pub json: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List credentials as JSON.
    #[command(about = "List discovered credentials without their values")]
    List,
    /// Print one credential's value.
    #[command(about = "Print the value of one credential")]
    Show {
        /// Credential id.
        #[arg(help = "Credential id (the secret id)")]
        id: String,
    },
}

impl Cli {
    /// Configuration fields set on the command line
    #[must_use]
    pub fn overrides(&self) -> PluginConfiguration {
        let mut config = PluginConfiguration {
            project: self.project.clone(),
            location: self.location.clone(),
            ..PluginConfiguration::default()
        };
        if let (Some(label), Some(value)) = (&self.filter_label, &self.filter_value) {
            config = config.with_filter(Filter::new(label.as_str(), value.as_str()));
        }
        if let Some(filter) = &self.server_filter {
            config = config.with_server_side_filter(filter.as_str());
        }
        if self.best_effort {
            config = config.with_scan_policy(ScanPolicy::BestEffort);
        }
        config
    }
}

/// Parse command line arguments into a CLI structure.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["gsmcreds", "list"]).unwrap();

        assert_eq!(cli.level, LogLevel::Warn);
        assert_eq!(cli.mode, ModeArg::Auto);
        assert!(!cli.json);
        assert!(!cli.best_effort);
        assert_eq!(cli.command, Commands::List);
        assert_eq!(cli.overrides(), PluginConfiguration::default());
    }

    #[test]
    fn test_cli_log_level_parsing() {
        let cli = Cli::try_parse_from(["gsmcreds", "--level", "debug", "list"]).unwrap();
        assert_eq!(cli.level, LogLevel::Debug);

        let cli = Cli::try_parse_from(["gsmcreds", "-l", "error", "list"]).unwrap();
        assert_eq!(cli.level, LogLevel::Error);
    }

    #[test]
    fn test_show_requires_id() {
        assert!(Cli::try_parse_from(["gsmcreds", "show"]).is_err());

        let cli = Cli::try_parse_from(["gsmcreds", "show", "db-pass"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Show {
                id: "db-pass".to_string()
            }
        );
    }

    #[test]
    fn test_overrides_from_flags() {
        let cli = Cli::try_parse_from([
            "gsmcreds",
            "list",
            "--project",
            "p1,p2",
            "--location",
            "global,eu",
            "--filter-label",
            "env",
            "--filter-value",
            "prod,staging",
            "--server-filter",
            "labels.team=infra",
            "--best-effort",
        ])
        .unwrap();

        let config = cli.overrides();
        assert_eq!(config.project_ids(), vec!["p1", "p2"]);
        assert_eq!(config.location_ids(), vec!["global", "eu"]);
        assert_eq!(config.filter, Some(Filter::new("env", "prod,staging")));
        assert_eq!(
            config.server_side_filter.and_then(|f| f.filter).as_deref(),
            Some("labels.team=infra")
        );
        assert_eq!(config.scan_policy, ScanPolicy::BestEffort);
    }

    #[test]
    fn test_filter_flags_go_together() {
        assert!(Cli::try_parse_from(["gsmcreds", "list", "--filter-label", "env"]).is_err());
        assert!(Cli::try_parse_from(["gsmcreds", "list", "--filter-value", "dev"]).is_err());
    }

    #[test]
    fn test_mode_parsing() {
        let cli = Cli::try_parse_from(["gsmcreds", "list", "--mode", "cli"]).unwrap();
        assert_eq!(cli.mode.resolve(), GcpMode::Cli);

        let cli = Cli::try_parse_from(["gsmcreds", "list", "--mode", "http"]).unwrap();
        assert_eq!(cli.mode.resolve(), GcpMode::Http);

        assert!(Cli::try_parse_from(["gsmcreds", "list", "--mode", "grpc"]).is_err());
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(exit_code_for(&CliError::config("bad")), EXIT_CLI);
        assert_eq!(
            exit_code_for(&CliError::store_with_help("denied", "check access")),
            EXIT_RUNTIME
        );
        assert_eq!(exit_code_for(&CliError::other("broken pipe")), EXIT_RUNTIME);
        assert_eq!(EXIT_OK, 0);
    }

    #[test]
    fn test_list_failure_maps_to_store_error() {
        let err = gsmcreds_secrets::DiscoveryError::List {
            scope: gsmcreds_secrets::Scope::global("p"),
            source: gsmcreds_secrets::StoreError::Request {
                resource: "projects/p".to_string(),
                message: "denied".to_string(),
            },
        };
        let cli_err = CliError::from(err);
        assert!(matches!(cli_err, CliError::Store { .. }));
        assert!(cli_err.to_string().contains("denied"));
    }
}
