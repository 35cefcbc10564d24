use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the cloudflare-purge binary.
#[derive(Debug, Parser)]
#[command(
    name = "cloudflare-purge",
    version,
    about = "Cloudflare cache purge service"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CF_PURGE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service: purge endpoint, event bridge and admin control.
    Serve(Box<ServeArgs>),
    /// Issue a single purge request and print the outcome as JSON.
    Purge(PurgeArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Enable or disable the purge plugin.
    #[arg(
        long = "purge-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub purge_enabled: Option<bool>,

    /// Toggle verbose purge diagnostics.
    #[arg(
        long = "purge-debug",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub purge_debug: Option<bool>,

    /// Override the public site origin used to build purge URLs.
    #[arg(long = "purge-base-url", value_name = "URL")]
    pub purge_base_url: Option<String>,

    /// Dispatch hook purges through the internal endpoint (true) or directly (false).
    #[arg(
        long = "purge-use-endpoint",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub purge_use_endpoint: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PurgeArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Purge the whole zone instead of individual URLs.
    #[arg(long, action = clap::ArgAction::SetTrue, conflicts_with = "urls")]
    pub everything: bool,

    /// Absolute URLs to purge.
    #[arg(value_name = "URL", required_unless_present = "everything")]
    pub urls: Vec<String>,
}
