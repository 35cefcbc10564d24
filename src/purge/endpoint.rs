//! `POST /cloudflare-purge`: authenticated manual and internal purge entry point.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use cloudflare_purge_api_types::{
    INTERNAL_CALL_HEADER, PurgeDetails, PurgeEndpointRequest, PurgeEndpointResponse,
    PurgeErrorResponse,
};
use metrics::counter;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::domain::{CorrelationId, PurgeRequest, PurgeScope};
use crate::host::{EndpointHandler, EndpointRequest, EndpointResponse};

use super::config::PurgeConfig;
use super::executor::PurgeExecutor;

const METRIC_PURGE_ENDPOINT_TOTAL: &str = "cloudflare_purge_endpoint_total";
const MAX_ERROR_DETAIL_CHARS: usize = 500;

pub struct PurgeEndpoint {
    config: Arc<PurgeConfig>,
    executor: Arc<dyn PurgeExecutor>,
}

impl PurgeEndpoint {
    pub fn new(config: Arc<PurgeConfig>, executor: Arc<dyn PurgeExecutor>) -> Self {
        Self { config, executor }
    }

    fn reject(
        status: StatusCode,
        error: &str,
        correlation_id: &CorrelationId,
        details: Option<String>,
    ) -> EndpointResponse {
        counter!(METRIC_PURGE_ENDPOINT_TOTAL, "status" => status.as_str().to_owned()).increment(1);
        EndpointResponse::json(
            status,
            &PurgeErrorResponse {
                error: error.to_string(),
                correlation_id: correlation_id.to_string(),
                details,
            },
        )
    }
}

#[async_trait]
impl EndpointHandler for PurgeEndpoint {
    async fn handle(&self, request: EndpointRequest) -> EndpointResponse {
        let correlation_id = CorrelationId::generate();
        let internal_call = is_internal_call(&request.headers);

        if request.user.is_none() && !internal_call {
            warn!(
                correlation_id = %correlation_id,
                "Rejected unauthenticated purge request"
            );
            return Self::reject(StatusCode::UNAUTHORIZED, "Unauthorized", &correlation_id, None);
        }

        let body = match parse_body(request.body) {
            Ok(body) => body,
            Err(err) => {
                warn!(
                    correlation_id = %correlation_id,
                    error = %err,
                    "Rejected malformed purge request body"
                );
                return Self::reject(
                    StatusCode::BAD_REQUEST,
                    "Invalid request body",
                    &correlation_id,
                    Some(err.to_string()),
                );
            }
        };

        let scope = PurgeScope::from_parts(body.files, body.purge_everything.unwrap_or(false));
        info!(
            correlation_id = %correlation_id,
            user_id = request.user.as_ref().map(|user| user.id.as_str()),
            internal_call,
            purge_everything = scope.is_everything(),
            files_count = scope.files().len(),
            "Purge endpoint invoked"
        );

        let purge = PurgeRequest::new(scope, correlation_id.clone());
        let outcome = self
            .executor
            .execute(
                &purge,
                self.config.credentials.as_ref(),
                self.config.log_options(),
            )
            .await;

        match outcome {
            Ok(result) => {
                info!(
                    correlation_id = %correlation_id,
                    status = result.http_status,
                    succeeded = result.succeeded,
                    "Purge endpoint completed"
                );
                counter!(METRIC_PURGE_ENDPOINT_TOTAL, "status" => "200").increment(1);
                EndpointResponse::json(
                    StatusCode::OK,
                    &PurgeEndpointResponse {
                        success: result.succeeded,
                        correlation_id: correlation_id.to_string(),
                        details: PurgeDetails {
                            status: result.http_status,
                            files_purged: purge.scope().file_count(),
                            purge_everything: purge.scope().is_everything(),
                            execution_time: format!("{}ms", result.elapsed_ms()),
                        },
                        cloudflare_response: if self.config.debug {
                            result.provider_response
                        } else {
                            None
                        },
                    },
                )
            }
            Err(err) => {
                error!(
                    correlation_id = %correlation_id,
                    error = %err,
                    "Purge endpoint failed"
                );
                Self::reject(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Purge failed",
                    &correlation_id,
                    Some(truncate(&err.to_string(), MAX_ERROR_DETAIL_CHARS)),
                )
            }
        }
    }
}

fn is_internal_call(headers: &HeaderMap) -> bool {
    headers
        .get(INTERNAL_CALL_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == "true")
}

/// A missing body means "no files, no full purge".
fn parse_body(body: Value) -> Result<PurgeEndpointRequest, serde_json::Error> {
    if body.is_null() {
        return Ok(PurgeEndpointRequest::default());
    }
    serde_json::from_value(body)
}

fn truncate(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &message[..idx]),
        None => message.to_string(),
    }
}
