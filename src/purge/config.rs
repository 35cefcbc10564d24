use std::fmt;
use std::sync::Arc;

use url::Url;

use super::executor::LogOptions;
use super::options::{
    HookEvent, OptionsError, PurgeEverythingFn, PurgeOptions, TargetSelection, UrlBuilder,
    UrlBuilderSetting,
};
use super::redact::redact;
use super::resolver::{UrlBuilderArgs, default_url_builder};

pub const ZONE_ID_ENV: &str = "CLOUDFLARE_ZONE_ID";
pub const API_TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";
pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com";

/// Zone id and API token, both non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct PurgeCredentials {
    zone_id: String,
    api_token: String,
}

impl PurgeCredentials {
    /// Returns `None` unless both values are non-empty.
    pub fn new(zone_id: impl Into<String>, api_token: impl Into<String>) -> Option<Self> {
        let zone_id = zone_id.into();
        let api_token = api_token.into();
        if zone_id.is_empty() || api_token.is_empty() {
            return None;
        }
        Some(Self { zone_id, api_token })
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }
}

impl fmt::Debug for PurgeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurgeCredentials")
            .field("zone_id", &redact(&self.zone_id))
            .field("api_token", &redact(&self.api_token))
            .finish()
    }
}

/// Whether a change purges the whole zone.
#[derive(Clone)]
pub enum PurgeEverythingPolicy {
    Static(bool),
    Computed(PurgeEverythingFn),
}

impl PurgeEverythingPolicy {
    pub fn evaluate(&self, args: &UrlBuilderArgs<'_>) -> bool {
        match self {
            Self::Static(value) => *value,
            Self::Computed(policy) => policy(args),
        }
    }
}

impl fmt::Debug for PurgeEverythingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// How installed hooks dispatch a purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// In-process call to the registered purge endpoint.
    Endpoint,
    /// Direct executor call.
    Direct,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Endpoint => "endpoint",
            Self::Direct => "direct",
        }
    }
}

/// Fully resolved plugin configuration. Immutable once built.
#[derive(Clone)]
pub struct PurgeConfig {
    pub enabled: bool,
    pub credentials: Option<PurgeCredentials>,
    pub api_base: Url,
    pub base_url: String,
    pub collections: TargetSelection,
    pub globals: TargetSelection,
    pub localized: bool,
    pub events: Vec<HookEvent>,
    pub purge_everything: PurgeEverythingPolicy,
    pub url_builder: Option<UrlBuilder>,
    pub mode: ExecutionMode,
    pub show_purge_everything_button: bool,
    pub debug: bool,
    pub log_provider_json: bool,
    pub provided_keys: Vec<&'static str>,
}

impl PurgeConfig {
    /// Apply defaults, falling back to `CLOUDFLARE_ZONE_ID` / `CLOUDFLARE_API_TOKEN`.
    pub fn resolve(options: PurgeOptions) -> Result<Self, OptionsError> {
        Self::resolve_with_env(options, |key| std::env::var(key).ok())
    }

    pub fn resolve_with_env<F>(options: PurgeOptions, lookup: F) -> Result<Self, OptionsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provided_keys = options.provided_keys();
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        let zone_id = non_empty(options.zone_id).or_else(|| non_empty(lookup(ZONE_ID_ENV)));
        let api_token = non_empty(options.api_token).or_else(|| non_empty(lookup(API_TOKEN_ENV)));
        let credentials = zone_id
            .zip(api_token)
            .and_then(|(zone, token)| PurgeCredentials::new(zone, token));

        let api_base_raw = options
            .api_base
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = Url::parse(&api_base_raw).map_err(|err| OptionsError::InvalidApiBase {
            value: api_base_raw.clone(),
            reason: err.to_string(),
        })?;
        if api_base.cannot_be_a_base() {
            return Err(OptionsError::InvalidApiBase {
                value: api_base_raw,
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        let purge_everything = match options.purge_everything_fn {
            Some(policy) => PurgeEverythingPolicy::Computed(policy),
            None => PurgeEverythingPolicy::Static(options.purge_everything.unwrap_or(false)),
        };

        let url_builder = match options.url_builder {
            UrlBuilderSetting::Default => Some(Arc::new(default_url_builder) as UrlBuilder),
            UrlBuilderSetting::Custom(builder) => Some(builder),
            UrlBuilderSetting::Disabled => None,
        };

        let mode = if options.use_endpoint.unwrap_or(true) {
            ExecutionMode::Endpoint
        } else {
            ExecutionMode::Direct
        };

        Ok(Self {
            enabled: options.enabled.unwrap_or(false),
            credentials,
            api_base,
            base_url: options.base_url.unwrap_or_default(),
            collections: options.collections.unwrap_or_default(),
            globals: options.globals.unwrap_or_default(),
            localized: options.localized.unwrap_or(false),
            events: options.events.unwrap_or_else(HookEvent::defaults),
            purge_everything,
            url_builder,
            mode,
            show_purge_everything_button: options.show_purge_everything_button.unwrap_or(false),
            debug: options.debug.unwrap_or(false),
            log_provider_json: options.log_provider_json.unwrap_or(false),
            provided_keys,
        })
    }

    pub fn reacts_to(&self, event: HookEvent) -> bool {
        self.events.contains(&event)
    }

    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            debug: self.debug,
            log_provider_json: self.log_provider_json,
        }
    }
}

impl fmt::Debug for PurgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurgeConfig")
            .field("enabled", &self.enabled)
            .field("credentials", &self.credentials)
            .field("api_base", &self.api_base.as_str())
            .field("base_url", &self.base_url)
            .field("collections", &self.collections)
            .field("globals", &self.globals)
            .field("localized", &self.localized)
            .field("events", &self.events)
            .field("purge_everything", &self.purge_everything)
            .field("url_builder", &self.url_builder.is_some())
            .field("mode", &self.mode)
            .field(
                "show_purge_everything_button",
                &self.show_purge_everything_button,
            )
            .field("debug", &self.debug)
            .field("log_provider_json", &self.log_provider_json)
            .finish()
    }
}
