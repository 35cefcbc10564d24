//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{collections::HashSet, net::SocketAddr, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::host::HostUser;
use crate::purge::PurgeOptions;

pub use cli::{CliArgs, Command, LoggingOverrides, PurgeArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "cloudflare-purge";
const ENV_PREFIX: &str = "CF_PURGE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub purge: PurgeOptions,
    pub auth: AuthSettings,
    pub host: HostSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Static bearer tokens standing in for host sessions.
#[derive(Clone, Default)]
pub struct AuthSettings {
    pub tokens: Vec<SessionToken>,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

#[derive(Clone)]
pub struct SessionToken {
    pub token: String,
    pub user: HostUser,
}

/// Collections and globals the standalone host registers.
#[derive(Debug, Clone, Default)]
pub struct HostSettings {
    pub collections: Vec<TargetSettings>,
    pub globals: Vec<TargetSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetSettings {
    pub slug: String,
    #[serde(default)]
    pub drafts: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("purge.collections")
            .with_list_parse_key("purge.globals")
            .with_list_parse_key("purge.events")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Purge(args)) => raw.apply_logging_overrides(&args.logging),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    purge: PurgeOptions,
    auth: RawAuthSettings,
    host: RawHostSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(enabled) = overrides.purge_enabled {
            self.purge.enabled = Some(enabled);
        }
        if let Some(debug) = overrides.purge_debug {
            self.purge.debug = Some(debug);
        }
        if let Some(base_url) = overrides.purge_base_url.as_ref() {
            self.purge.base_url = Some(base_url.clone());
        }
        if let Some(use_endpoint) = overrides.purge_use_endpoint {
            self.purge.use_endpoint = Some(use_endpoint);
        }

        self.apply_logging_overrides(&overrides.logging);
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            purge,
            auth,
            host,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let auth = build_auth_settings(auth)?;
        let host = build_host_settings(host)?;

        Ok(Self {
            server,
            logging,
            purge,
            auth,
            host,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let mut seen = HashSet::new();
    let mut tokens = Vec::with_capacity(auth.tokens.len());

    for raw in auth.tokens {
        let token = raw.token.trim().to_string();
        if token.is_empty() {
            return Err(LoadError::invalid("auth.tokens", "token must not be empty"));
        }
        if !seen.insert(token.clone()) {
            return Err(LoadError::invalid("auth.tokens", "duplicate token"));
        }
        let user_id = raw.user_id.trim();
        if user_id.is_empty() {
            return Err(LoadError::invalid(
                "auth.tokens",
                "user_id must not be empty",
            ));
        }
        tokens.push(SessionToken {
            token,
            user: HostUser::new(user_id, raw.roles),
        });
    }

    Ok(AuthSettings { tokens })
}

fn build_host_settings(host: RawHostSettings) -> Result<HostSettings, LoadError> {
    let collections = unique_targets(host.collections, "host.collections")?;
    let globals = unique_targets(host.globals, "host.globals")?;
    Ok(HostSettings {
        collections,
        globals,
    })
}

fn unique_targets(
    targets: Vec<TargetSettings>,
    key: &'static str,
) -> Result<Vec<TargetSettings>, LoadError> {
    let mut seen = HashSet::new();
    for target in &targets {
        if target.slug.trim().is_empty() {
            return Err(LoadError::invalid(key, "slug must not be empty"));
        }
        if !seen.insert(target.slug.as_str()) {
            return Err(LoadError::invalid(
                key,
                format!("duplicate slug `{}`", target.slug),
            ));
        }
    }
    Ok(targets)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    tokens: Vec<RawSessionToken>,
}

impl std::fmt::Debug for RawAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawAuthSettings")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

#[derive(Clone, Deserialize)]
struct RawSessionToken {
    token: String,
    user_id: String,
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHostSettings {
    collections: Vec<TargetSettings>,
    globals: Vec<TargetSettings>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
