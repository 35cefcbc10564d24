//! Cloudflare purge pipeline.
//!
//! Turns host lifecycle events into cache purge requests:
//!
//! - **Classifier**: decides whether a change is publish-equivalent
//! - **Resolver**: computes the scope (URL list or full zone)
//! - **Executor**: performs the `purge_cache` call
//! - **Endpoint**: authenticated `POST /cloudflare-purge` wrapping the executor
//! - **Plugin**: installs hook closures into a [`crate::host::HostConfig`]
//!
//! ## Configuration
//!
//! ```toml
//! [purge]
//! enabled = true
//! base_url = "https://example.com"
//! collections = ["posts", "pages"]
//! globals = "ALL"
//! events = ["after_change", "after_delete"]
//! use_endpoint = true
//! ```

pub mod admin;
pub mod classifier;
mod config;
mod endpoint;
mod executor;
mod hooks;
mod options;
mod plugin;
pub mod redact;
mod resolver;

pub use admin::{AdminPurgeError, AdminPurgeOutcome, PurgeEverythingControl};
pub use config::{ExecutionMode, PurgeConfig, PurgeCredentials, PurgeEverythingPolicy};
pub use endpoint::PurgeEndpoint;
pub use executor::{CloudflareExecutor, LogOptions, PurgeError, PurgeExecutor, PurgeResult};
pub use hooks::{PurgeHookError, PurgeOutcome, SkipReason};
pub use options::{
    HookEvent, OptionsError, PurgeEverythingFn, PurgeOptions, TargetSelection, TargetSet,
    UrlBuilder,
};
pub use plugin::{CloudflarePurgePlugin, PluginError};
pub use resolver::{ScopeResolver, UrlBuilderArgs, default_url_builder};
