//! Hook closures installed by the plugin: classify, resolve, dispatch.

use std::sync::Arc;

use axum::http::HeaderValue;
use cloudflare_purge_api_types::{INTERNAL_CALL_HEADER, PurgeEndpointRequest};
use futures::FutureExt;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::{ChangeEvent, ChangeOperation, CorrelationId, PurgeRequest, PurgeScope};
use crate::host::{
    AfterChangeArgs, AfterChangeHook, AfterDeleteArgs, AfterDeleteHook, EndpointHandler,
    EndpointRequest, HookError, HookRequest,
};

use super::classifier;
use super::config::PurgeConfig;
use super::endpoint::PurgeEndpoint;
use super::executor::{PurgeError, PurgeExecutor};
use super::resolver::{ScopeResolver, UrlBuilderArgs};

#[derive(Debug, Error)]
pub enum PurgeHookError {
    #[error(transparent)]
    Purge(#[from] PurgeError),
    #[error("purge endpoint returned {status} (id={correlation_id}): {body}")]
    Endpoint {
        correlation_id: CorrelationId,
        status: u16,
        body: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Create/update on a drafts-enabled target that did not transition into `published`.
    NotPublished,
    /// The URL builder produced no URLs.
    NothingToPurge,
    /// Zone id or API token missing; nothing was sent to the provider.
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeOutcome {
    Skipped(SkipReason),
    Dispatched(PurgeScope),
}

/// Where a hook sends its purge.
#[derive(Clone)]
pub(super) enum Dispatch {
    Endpoint(Arc<PurgeEndpoint>),
    Direct(Arc<dyn PurgeExecutor>),
}

/// Everything one installed hook needs; cloned into each closure.
#[derive(Clone)]
pub(super) struct PurgePipeline {
    config: Arc<PurgeConfig>,
    dispatch: Dispatch,
}

impl PurgePipeline {
    pub(super) fn new(config: Arc<PurgeConfig>, dispatch: Dispatch) -> Self {
        Self { config, dispatch }
    }

    pub(super) async fn run(
        &self,
        event: &ChangeEvent,
        req: &HookRequest,
    ) -> Result<PurgeOutcome, PurgeHookError> {
        let correlation_id = CorrelationId::generate();
        info!(
            correlation_id = %correlation_id,
            target_kind = event.target.kind.as_str(),
            slug = %event.target.slug,
            operation = event.operation.as_str(),
            mode = self.config.mode.as_str(),
            "Purge hook triggered"
        );

        let args = UrlBuilderArgs::from_event(event, &self.config.base_url, self.config.localized);
        let resolver = ScopeResolver::new(&self.config);

        let everything = resolver.wants_everything(&args);
        if !everything && !classifier::classify(event) {
            info!(
                correlation_id = %correlation_id,
                "Change is not a publication; skipping purge"
            );
            return Ok(PurgeOutcome::Skipped(SkipReason::NotPublished));
        }

        let scope = if everything {
            PurgeScope::Everything
        } else {
            resolver.selective(&args, &correlation_id)
        };
        if scope.is_empty() {
            info!(
                correlation_id = %correlation_id,
                "No URLs resolved; nothing to purge"
            );
            return Ok(PurgeOutcome::Skipped(SkipReason::NothingToPurge));
        }

        let sent = match &self.dispatch {
            Dispatch::Endpoint(endpoint) => {
                self.via_endpoint(endpoint.as_ref(), &scope, &correlation_id, req)
                    .await?
            }
            Dispatch::Direct(executor) => {
                self.direct(executor.as_ref(), &scope, &correlation_id)
                    .await?
            }
        };

        if !sent {
            warn!(
                correlation_id = %correlation_id,
                mode = self.config.mode.as_str(),
                "Cloudflare credentials are not configured; purge skipped"
            );
            return Ok(PurgeOutcome::Skipped(SkipReason::NotConfigured));
        }
        Ok(PurgeOutcome::Dispatched(scope))
    }

    async fn via_endpoint(
        &self,
        endpoint: &PurgeEndpoint,
        scope: &PurgeScope,
        correlation_id: &CorrelationId,
        req: &HookRequest,
    ) -> Result<bool, PurgeHookError> {
        let mut headers = req.headers.clone();
        headers.insert(INTERNAL_CALL_HEADER, HeaderValue::from_static("true"));

        let body = PurgeEndpointRequest {
            files: (!scope.is_everything()).then(|| scope.files().to_vec()),
            purge_everything: Some(scope.is_everything()),
        };
        let request = EndpointRequest {
            user: req.user.clone(),
            headers,
            body: serde_json::to_value(&body).unwrap_or(Value::Null),
        };

        if self.config.debug {
            debug!(
                correlation_id = %correlation_id,
                body = ?body,
                "Dispatching purge through internal endpoint"
            );
        }

        let response = endpoint.handle(request).await;
        let endpoint_correlation_id = response
            .body
            .get("correlationId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if !response.is_success() {
            error!(
                correlation_id = %correlation_id,
                endpoint_correlation_id = %endpoint_correlation_id,
                status = response.status.as_u16(),
                body = %response.body,
                "Internal purge endpoint reported failure"
            );
            return Err(PurgeHookError::Endpoint {
                correlation_id: correlation_id.clone(),
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        // The endpoint answers 200 with `success: false` only when the executor skipped.
        let sent = response
            .body
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        info!(
            correlation_id = %correlation_id,
            endpoint_correlation_id = %endpoint_correlation_id,
            status = response.status.as_u16(),
            sent,
            "Internal purge endpoint answered"
        );
        Ok(sent)
    }

    async fn direct(
        &self,
        executor: &dyn PurgeExecutor,
        scope: &PurgeScope,
        correlation_id: &CorrelationId,
    ) -> Result<bool, PurgeHookError> {
        let request = PurgeRequest::new(scope.clone(), correlation_id.clone());
        let result = executor
            .execute(
                &request,
                self.config.credentials.as_ref(),
                self.config.log_options(),
            )
            .await?;
        if result.is_skipped() {
            return Ok(false);
        }

        info!(
            correlation_id = %correlation_id,
            status = result.http_status,
            succeeded = result.succeeded,
            elapsed_ms = result.elapsed_ms() as u64,
            "Direct purge finished"
        );
        Ok(true)
    }
}

/// Closure for a collection or global `afterChange` chain. Returns the document unchanged.
pub(super) fn after_change_hook(pipeline: PurgePipeline) -> AfterChangeHook {
    Arc::new(move |args: AfterChangeArgs| {
        let pipeline = pipeline.clone();
        async move {
            let event = ChangeEvent {
                operation: args.operation,
                target: args.target,
                document: args.doc,
                previous_document: args.previous_doc,
                locale: args.req.locale.clone(),
            };
            pipeline
                .run(&event, &args.req)
                .await
                .map_err(|err| HookError::failed("afterChange", err))?;
            Ok(event.document)
        }
        .boxed()
    })
}

/// Closure for a collection `afterDelete` chain. Returns the document unchanged.
pub(super) fn after_delete_hook(pipeline: PurgePipeline) -> AfterDeleteHook {
    Arc::new(move |args: AfterDeleteArgs| {
        let pipeline = pipeline.clone();
        async move {
            let event = ChangeEvent {
                operation: ChangeOperation::Delete,
                target: args.target,
                document: args.doc,
                previous_document: None,
                locale: args.req.locale.clone(),
            };
            pipeline
                .run(&event, &args.req)
                .await
                .map_err(|err| HookError::failed("afterDelete", err))?;
            Ok(event.document)
        }
        .boxed()
    })
}
