//! Hook chains: ordered, append-only sequences of closures per lifecycle point.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::{ChangeOperation, Document, TargetMeta};

use super::user::HostUser;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("{hook} hook failed: {source}")]
    Failed {
        hook: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("init callback failed: {0}")]
    Init(String),
}

impl HookError {
    pub fn failed(hook: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Failed {
            hook,
            source: Box::new(source),
        }
    }
}

/// Request context a hook runs under.
#[derive(Debug, Clone, Default)]
pub struct HookRequest {
    pub user: Option<HostUser>,
    pub locale: Option<String>,
    pub headers: HeaderMap,
}

#[derive(Debug, Clone)]
pub struct AfterChangeArgs {
    pub req: HookRequest,
    pub target: TargetMeta,
    pub operation: ChangeOperation,
    pub doc: Document,
    pub previous_doc: Option<Document>,
}

#[derive(Debug, Clone)]
pub struct AfterDeleteArgs {
    pub req: HookRequest,
    pub target: TargetMeta,
    pub doc: Document,
}

/// Snapshot handed to the init callback.
#[derive(Debug, Clone, Default)]
pub struct InitContext {
    pub collections: Vec<String>,
    pub globals: Vec<String>,
    pub endpoints: Vec<String>,
}

pub type HookFuture = BoxFuture<'static, Result<Document, HookError>>;
pub type InitFuture = BoxFuture<'static, Result<(), HookError>>;

pub type AfterChangeHook = Arc<dyn Fn(AfterChangeArgs) -> HookFuture + Send + Sync>;
pub type AfterDeleteHook = Arc<dyn Fn(AfterDeleteArgs) -> HookFuture + Send + Sync>;
pub type InitCallback = Arc<dyn Fn(InitContext) -> InitFuture + Send + Sync>;

#[derive(Clone, Default)]
pub struct CollectionHooks {
    pub after_change: Vec<AfterChangeHook>,
    pub after_delete: Vec<AfterDeleteHook>,
}

impl fmt::Debug for CollectionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionHooks")
            .field("after_change", &self.after_change.len())
            .field("after_delete", &self.after_delete.len())
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct GlobalHooks {
    pub after_change: Vec<AfterChangeHook>,
}

impl fmt::Debug for GlobalHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalHooks")
            .field("after_change", &self.after_change.len())
            .finish()
    }
}

/// Run hooks in registration order; each hook sees the document the previous one returned.
pub(super) async fn run_after_change(
    hooks: &[AfterChangeHook],
    args: AfterChangeArgs,
) -> Result<Document, HookError> {
    let AfterChangeArgs {
        req,
        target,
        operation,
        mut doc,
        previous_doc,
    } = args;

    for hook in hooks {
        doc = hook(AfterChangeArgs {
            req: req.clone(),
            target: target.clone(),
            operation,
            doc,
            previous_doc: previous_doc.clone(),
        })
        .await?;
    }

    Ok(doc)
}

pub(super) async fn run_after_delete(
    hooks: &[AfterDeleteHook],
    args: AfterDeleteArgs,
) -> Result<Document, HookError> {
    let AfterDeleteArgs {
        req,
        target,
        mut doc,
    } = args;

    for hook in hooks {
        doc = hook(AfterDeleteArgs {
            req: req.clone(),
            target: target.clone(),
            doc,
        })
        .await?;
    }

    Ok(doc)
}
