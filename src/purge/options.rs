//! User-supplied plugin options, before defaults and environment fallbacks.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use super::redact::redact;
use super::resolver::UrlBuilderArgs;

/// Keyword selecting every registered collection or global.
pub const ALL_KEYWORD: &str = "ALL";

/// Maps a change to the list of absolute URLs to purge.
pub type UrlBuilder = Arc<dyn Fn(&UrlBuilderArgs<'_>) -> Vec<String> + Send + Sync>;

/// Decides per change whether the whole zone should be purged.
pub type PurgeEverythingFn = Arc<dyn Fn(&UrlBuilderArgs<'_>) -> bool + Send + Sync>;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("invalid api_base `{value}`: {reason}")]
    InvalidApiBase { value: String, reason: String },
    #[error("invalid target selection `{0}`: expected \"ALL\" or a list of slugs")]
    InvalidSelection(String),
}

/// Lifecycle hooks the plugin can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    #[serde(alias = "afterChange")]
    AfterChange,
    #[serde(alias = "afterDelete")]
    AfterDelete,
}

impl HookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AfterChange => "afterChange",
            Self::AfterDelete => "afterDelete",
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::AfterChange, Self::AfterDelete]
    }
}

/// Which collections or globals receive hooks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "RawSelection")]
pub enum TargetSelection {
    All,
    #[default]
    None,
    Slugs(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelection {
    Keyword(String),
    Slugs(Vec<String>),
}

impl TryFrom<RawSelection> for TargetSelection {
    type Error = OptionsError;

    fn try_from(raw: RawSelection) -> Result<Self, Self::Error> {
        match raw {
            RawSelection::Keyword(word) if word == ALL_KEYWORD => Ok(Self::All),
            RawSelection::Keyword(word) => Err(OptionsError::InvalidSelection(word)),
            RawSelection::Slugs(slugs) if slugs.is_empty() => Ok(Self::None),
            // Environment lists arrive as `["ALL"]`.
            RawSelection::Slugs(slugs) if slugs.len() == 1 && slugs[0] == ALL_KEYWORD => {
                Ok(Self::All)
            }
            RawSelection::Slugs(slugs) => Ok(Self::Slugs(slugs)),
        }
    }
}

impl TargetSelection {
    pub fn slugs<I, S>(slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slugs: Vec<String> = slugs.into_iter().map(Into::into).collect();
        if slugs.is_empty() {
            Self::None
        } else {
            Self::Slugs(slugs)
        }
    }

    /// Resolve against the slugs the host actually registered.
    ///
    /// Unknown slugs in an explicit list are kept; they simply match nothing.
    pub fn resolve<'a>(&self, registered: impl IntoIterator<Item = &'a str>) -> TargetSet {
        let slugs = match self {
            Self::All => registered.into_iter().map(str::to_string).collect(),
            Self::None => BTreeSet::new(),
            Self::Slugs(slugs) => slugs.iter().cloned().collect(),
        };
        TargetSet(slugs)
    }
}

/// Concrete slug set computed once at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet(BTreeSet<String>);

impl TargetSet {
    pub fn contains(&self, slug: &str) -> bool {
        self.0.contains(slug)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[derive(Clone, Default)]
pub(super) enum UrlBuilderSetting {
    #[default]
    Default,
    Custom(UrlBuilder),
    Disabled,
}

/// Options as provided by the embedding application or the `[purge]` config section.
///
/// Every field is optional; [`super::PurgeConfig::resolve`] applies defaults.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct PurgeOptions {
    pub enabled: Option<bool>,
    pub zone_id: Option<String>,
    pub api_token: Option<String>,
    pub api_base: Option<String>,
    pub base_url: Option<String>,
    pub collections: Option<TargetSelection>,
    pub globals: Option<TargetSelection>,
    pub localized: Option<bool>,
    pub events: Option<Vec<HookEvent>>,
    pub purge_everything: Option<bool>,
    pub show_purge_everything_button: Option<bool>,
    pub debug: Option<bool>,
    pub log_provider_json: Option<bool>,
    pub use_endpoint: Option<bool>,
    #[serde(skip)]
    pub(super) purge_everything_fn: Option<PurgeEverythingFn>,
    #[serde(skip)]
    pub(super) url_builder: UrlBuilderSetting,
}

impl PurgeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default URL builder.
    pub fn with_url_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(&UrlBuilderArgs<'_>) -> Vec<String> + Send + Sync + 'static,
    {
        self.url_builder = UrlBuilderSetting::Custom(Arc::new(builder));
        self
    }

    /// Remove the URL builder entirely; selective purges resolve to nothing.
    pub fn without_url_builder(mut self) -> Self {
        self.url_builder = UrlBuilderSetting::Disabled;
        self
    }

    /// Decide per change whether to purge the whole zone. Takes precedence over `purge_everything`.
    pub fn with_purge_everything_fn<F>(mut self, policy: F) -> Self
    where
        F: Fn(&UrlBuilderArgs<'_>) -> bool + Send + Sync + 'static,
    {
        self.purge_everything_fn = Some(Arc::new(policy));
        self
    }

    /// Names of the options that were explicitly set, for debug logging.
    pub fn provided_keys(&self) -> Vec<&'static str> {
        let flags = [
            ("enabled", self.enabled.is_some()),
            ("zone_id", self.zone_id.is_some()),
            ("api_token", self.api_token.is_some()),
            ("api_base", self.api_base.is_some()),
            ("base_url", self.base_url.is_some()),
            ("collections", self.collections.is_some()),
            ("globals", self.globals.is_some()),
            ("localized", self.localized.is_some()),
            ("events", self.events.is_some()),
            (
                "purge_everything",
                self.purge_everything.is_some() || self.purge_everything_fn.is_some(),
            ),
            (
                "show_purge_everything_button",
                self.show_purge_everything_button.is_some(),
            ),
            ("debug", self.debug.is_some()),
            ("log_provider_json", self.log_provider_json.is_some()),
            ("use_endpoint", self.use_endpoint.is_some()),
            (
                "url_builder",
                !matches!(self.url_builder, UrlBuilderSetting::Default),
            ),
        ];
        flags
            .into_iter()
            .filter_map(|(key, set)| set.then_some(key))
            .collect()
    }
}

impl fmt::Debug for PurgeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurgeOptions")
            .field("enabled", &self.enabled)
            .field("zone_id", &self.zone_id.as_deref().map(redact))
            .field("api_token", &self.api_token.as_deref().map(redact))
            .field("api_base", &self.api_base)
            .field("base_url", &self.base_url)
            .field("collections", &self.collections)
            .field("globals", &self.globals)
            .field("localized", &self.localized)
            .field("events", &self.events)
            .field("purge_everything", &self.purge_everything)
            .field("purge_everything_fn", &self.purge_everything_fn.is_some())
            .field(
                "show_purge_everything_button",
                &self.show_purge_everything_button,
            )
            .field("debug", &self.debug)
            .field("log_provider_json", &self.log_provider_json)
            .field("use_endpoint", &self.use_endpoint)
            .finish_non_exhaustive()
    }
}
