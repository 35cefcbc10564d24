//! Host content-management contract.
//!
//! The plugin never interprets the host's schema. It reads and augments a
//! [`HostConfig`]: the registered collections and globals with their hook
//! chains, the endpoint list, the init callback slot, and the admin
//! component slot.

mod endpoint;
mod hooks;
mod user;

pub use endpoint::{
    EndpointHandler, EndpointMethod, EndpointRegistration, EndpointRequest, EndpointResponse,
};
pub use hooks::{
    AfterChangeArgs, AfterChangeHook, AfterDeleteArgs, AfterDeleteHook, CollectionHooks,
    GlobalHooks, HookError, HookFuture, HookRequest, InitCallback, InitContext, InitFuture,
};
pub use user::HostUser;

use crate::domain::{ChangeOperation, Document, TargetMeta};

/// A registered collection and its lifecycle hook chains.
#[derive(Clone, Debug, Default)]
pub struct CollectionConfig {
    pub slug: String,
    /// Versioned with a draft/published status field.
    pub drafts: bool,
    pub hooks: CollectionHooks,
}

impl CollectionConfig {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            ..Default::default()
        }
    }

    pub fn with_drafts(mut self, drafts: bool) -> Self {
        self.drafts = drafts;
        self
    }

    pub fn meta(&self) -> TargetMeta {
        TargetMeta::collection(&self.slug, self.drafts)
    }

    /// Run the after-change chain for a committed write.
    pub async fn after_change(
        &self,
        req: HookRequest,
        operation: ChangeOperation,
        doc: Document,
        previous_doc: Option<Document>,
    ) -> Result<Document, HookError> {
        let args = AfterChangeArgs {
            req,
            target: self.meta(),
            operation,
            doc,
            previous_doc,
        };
        hooks::run_after_change(&self.hooks.after_change, args).await
    }

    /// Run the after-delete chain for a committed delete.
    pub async fn after_delete(
        &self,
        req: HookRequest,
        doc: Document,
    ) -> Result<Document, HookError> {
        let args = AfterDeleteArgs {
            req,
            target: self.meta(),
            doc,
        };
        hooks::run_after_delete(&self.hooks.after_delete, args).await
    }
}

/// A registered global. Globals have no delete lifecycle.
#[derive(Clone, Debug, Default)]
pub struct GlobalConfig {
    pub slug: String,
    pub drafts: bool,
    pub hooks: GlobalHooks,
}

impl GlobalConfig {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            ..Default::default()
        }
    }

    pub fn with_drafts(mut self, drafts: bool) -> Self {
        self.drafts = drafts;
        self
    }

    pub fn meta(&self) -> TargetMeta {
        TargetMeta::global(&self.slug, self.drafts)
    }

    pub async fn after_change(
        &self,
        req: HookRequest,
        doc: Document,
        previous_doc: Option<Document>,
    ) -> Result<Document, HookError> {
        let args = AfterChangeArgs {
            req,
            target: self.meta(),
            operation: ChangeOperation::Update,
            doc,
            previous_doc,
        };
        hooks::run_after_change(&self.hooks.after_change, args).await
    }
}

/// Component slots of the host admin UI.
#[derive(Clone, Debug, Default)]
pub struct AdminConfig {
    /// Component ids rendered after the dashboard.
    pub after_dashboard: Vec<String>,
}

/// The host configuration the plugin reads and augments.
#[derive(Clone, Default)]
pub struct HostConfig {
    pub collections: Vec<CollectionConfig>,
    pub globals: Vec<GlobalConfig>,
    pub endpoints: Vec<EndpointRegistration>,
    pub on_init: Option<InitCallback>,
    pub admin: AdminConfig,
}

impl std::fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostConfig")
            .field("collections", &self.collections)
            .field("globals", &self.globals)
            .field("endpoints", &self.endpoints)
            .field("on_init", &self.on_init.is_some())
            .field("admin", &self.admin)
            .finish()
    }
}

impl HostConfig {
    pub fn collection(&self, slug: &str) -> Option<&CollectionConfig> {
        self.collections.iter().find(|c| c.slug == slug)
    }

    pub fn global(&self, slug: &str) -> Option<&GlobalConfig> {
        self.globals.iter().find(|g| g.slug == slug)
    }

    pub fn endpoint(&self, path: &str, method: EndpointMethod) -> Option<&EndpointRegistration> {
        self.endpoints
            .iter()
            .find(|e| e.path == path && e.method == method)
    }

    pub fn init_context(&self) -> InitContext {
        InitContext {
            collections: self.collections.iter().map(|c| c.slug.clone()).collect(),
            globals: self.globals.iter().map(|g| g.slug.clone()).collect(),
            endpoints: self.endpoints.iter().map(|e| e.path.clone()).collect(),
        }
    }

    /// Invoke the init callback, if any, once the host is fully configured.
    pub async fn run_init(&self) -> Result<(), HookError> {
        match &self.on_init {
            Some(callback) => callback(self.init_context()).await,
            None => Ok(()),
        }
    }
}
