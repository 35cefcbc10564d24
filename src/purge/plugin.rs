//! Installs purge hooks, the purge endpoint and the admin control into a host configuration.

use std::sync::Arc;

use cloudflare_purge_api_types::PURGE_ENDPOINT_PATH;
use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::CorrelationId;
use crate::host::{EndpointMethod, EndpointRegistration, HostConfig, InitCallback, InitContext};

use super::admin::{PURGE_BUTTON_COMPONENT, PurgeEverythingControl};
use super::config::{ExecutionMode, PurgeConfig};
use super::endpoint::PurgeEndpoint;
use super::executor::{CloudflareExecutor, PurgeExecutor};
use super::hooks::{Dispatch, PurgePipeline, after_change_hook, after_delete_hook};
use super::options::{HookEvent, OptionsError, PurgeOptions};

#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    Options(#[from] OptionsError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The Cloudflare purge plugin: resolved configuration plus the executor it dispatches to.
#[derive(Clone)]
pub struct CloudflarePurgePlugin {
    config: Arc<PurgeConfig>,
    executor: Arc<dyn PurgeExecutor>,
    endpoint: Arc<PurgeEndpoint>,
}

/// What [`CloudflarePurgePlugin::apply`] installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Installed {
    hooks: usize,
    collections: Vec<String>,
    globals: Vec<String>,
}

impl CloudflarePurgePlugin {
    pub fn new(config: PurgeConfig, executor: Arc<dyn PurgeExecutor>) -> Self {
        let config = Arc::new(config);
        let endpoint = Arc::new(PurgeEndpoint::new(config.clone(), executor.clone()));
        Self {
            config,
            executor,
            endpoint,
        }
    }

    /// Resolve options and back the plugin with a [`CloudflareExecutor`].
    pub fn from_options(options: PurgeOptions) -> Result<Self, PluginError> {
        let config = PurgeConfig::resolve(options)?;
        let executor = CloudflareExecutor::new(config.api_base.clone())?;
        Ok(Self::new(config, Arc::new(executor)))
    }

    pub fn config(&self) -> &PurgeConfig {
        &self.config
    }

    pub fn endpoint(&self) -> Arc<PurgeEndpoint> {
        self.endpoint.clone()
    }

    /// Admin "purge everything" control, when enabled and configured to be shown.
    pub fn admin_control(&self) -> Option<PurgeEverythingControl> {
        (self.config.enabled && self.config.show_purge_everything_button)
            .then(|| PurgeEverythingControl::new(self.endpoint.clone()))
    }

    /// Augment `host` with purge hooks. A disabled plugin returns it unchanged.
    ///
    /// Hooks are appended to existing chains, never replacing them. Targets are
    /// resolved here, once; collections registered later are not covered.
    pub fn apply(&self, mut host: HostConfig) -> HostConfig {
        let config = &self.config;
        let correlation_id = CorrelationId::generate();

        if config.debug {
            info!(
                correlation_id = %correlation_id,
                options_provided = ?config.provided_keys,
                "Initializing Cloudflare purge plugin"
            );
            info!(
                correlation_id = %correlation_id,
                config = ?config,
                has_credentials = config.credentials.is_some(),
                "Resolved Cloudflare purge configuration"
            );
        }

        if !config.enabled {
            if config.debug {
                info!(
                    correlation_id = %correlation_id,
                    "Cloudflare purge plugin disabled; host configuration unchanged"
                );
            }
            return host;
        }

        let dispatch = match config.mode {
            ExecutionMode::Endpoint => {
                host.endpoints.push(EndpointRegistration {
                    path: PURGE_ENDPOINT_PATH.to_string(),
                    method: EndpointMethod::Post,
                    handler: self.endpoint.clone(),
                });
                if config.debug {
                    info!(
                        correlation_id = %correlation_id,
                        path = PURGE_ENDPOINT_PATH,
                        "Registered purge endpoint"
                    );
                }
                Dispatch::Endpoint(self.endpoint.clone())
            }
            ExecutionMode::Direct => Dispatch::Direct(self.executor.clone()),
        };
        let pipeline = PurgePipeline::new(config.clone(), dispatch);

        let collections = config
            .collections
            .resolve(host.collections.iter().map(|c| c.slug.as_str()));
        let globals = config
            .globals
            .resolve(host.globals.iter().map(|g| g.slug.as_str()));
        if config.debug {
            info!(
                correlation_id = %correlation_id,
                collections = ?collections.iter().collect::<Vec<_>>(),
                globals = ?globals.iter().collect::<Vec<_>>(),
                events = ?config.events,
                "Resolved purge targets"
            );
        }

        let mut installed = Installed::default();
        let on_change = config.reacts_to(HookEvent::AfterChange);
        let on_delete = config.reacts_to(HookEvent::AfterDelete);

        for collection in host
            .collections
            .iter_mut()
            .filter(|c| collections.contains(&c.slug))
        {
            if on_change {
                collection
                    .hooks
                    .after_change
                    .push(after_change_hook(pipeline.clone()));
                installed.hooks += 1;
            }
            if on_delete {
                collection
                    .hooks
                    .after_delete
                    .push(after_delete_hook(pipeline.clone()));
                installed.hooks += 1;
            }
            if config.debug {
                debug!(
                    correlation_id = %correlation_id,
                    collection = %collection.slug,
                    after_change = on_change,
                    after_delete = on_delete,
                    "Attached purge hooks to collection"
                );
            }
            installed.collections.push(collection.slug.clone());
        }

        for global in host
            .globals
            .iter_mut()
            .filter(|g| globals.contains(&g.slug))
        {
            if on_change {
                global
                    .hooks
                    .after_change
                    .push(after_change_hook(pipeline.clone()));
                installed.hooks += 1;
                if config.debug {
                    debug!(
                        correlation_id = %correlation_id,
                        global = %global.slug,
                        "Attached purge hook to global"
                    );
                }
                installed.globals.push(global.slug.clone());
            }
        }

        if config.show_purge_everything_button {
            host.admin
                .after_dashboard
                .push(PURGE_BUTTON_COMPONENT.to_string());
            if config.debug {
                info!(
                    correlation_id = %correlation_id,
                    component = PURGE_BUTTON_COMPONENT,
                    "Registered purge-everything admin component"
                );
            }
        }

        if config.debug {
            info!(
                correlation_id = %correlation_id,
                hooks_added = installed.hooks,
                collections = ?installed.collections,
                globals = ?installed.globals,
                "Cloudflare purge plugin configured"
            );
        }

        host.on_init = Some(wrap_init(host.on_init.take(), Arc::new(installed), config.debug));
        host
    }
}

/// Wrap the host's init callback so the plugin reports readiness, then defers to it.
fn wrap_init(previous: Option<InitCallback>, installed: Arc<Installed>, debug: bool) -> InitCallback {
    Arc::new(move |ctx: InitContext| {
        let previous = previous.clone();
        let installed = installed.clone();
        async move {
            let correlation_id = CorrelationId::generate();
            if debug {
                info!(
                    correlation_id = %correlation_id,
                    hooks_added = installed.hooks,
                    endpoints = ?ctx.endpoints,
                    "Cloudflare purge plugin initializing"
                );
            }
            if let Some(previous) = previous {
                previous(ctx).await?;
            }
            if debug {
                info!(
                    correlation_id = %correlation_id,
                    "Cloudflare purge plugin initialized"
                );
            }
            Ok(())
        }
        .boxed()
    })
}
