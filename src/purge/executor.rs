//! Outbound call to the Cloudflare `purge_cache` API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use cloudflare_purge_api_types::ProviderEnvelope;
use metrics::{counter, histogram};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::domain::{CorrelationId, PurgeRequest, PurgeScope};

use super::config::PurgeCredentials;
use super::redact::redact;

const METRIC_PURGE_ATTEMPT_TOTAL: &str = "cloudflare_purge_attempt_total";
const METRIC_PURGE_REQUEST_MS: &str = "cloudflare_purge_request_ms";

const USER_AGENT: &str = concat!("cloudflare-purge/", env!("CARGO_PKG_VERSION"));

/// Verbosity switches for a single purge attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Log the outbound payload (secrets redacted).
    pub debug: bool,
    /// With `debug`, also log the provider's response body.
    pub log_provider_json: bool,
}

/// Outcome of a purge attempt that did not fail.
#[derive(Debug, Clone)]
pub struct PurgeResult {
    /// The provider confirmed the purge.
    pub succeeded: bool,
    /// Provider HTTP status; `0` when the attempt was skipped for missing credentials.
    pub http_status: u16,
    pub endpoint: Option<Url>,
    /// What was sent; `None` when nothing was sent.
    pub scope_sent: Option<PurgeScope>,
    pub provider_response: Option<Value>,
    pub elapsed: Duration,
    pub correlation_id: CorrelationId,
}

impl PurgeResult {
    /// Result for an attempt that never reached the provider (missing credentials).
    pub fn skipped(correlation_id: CorrelationId) -> Self {
        Self {
            succeeded: false,
            http_status: 0,
            endpoint: None,
            scope_sent: None,
            provider_response: None,
            elapsed: Duration::ZERO,
            correlation_id,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.scope_sent.is_none()
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("network failure calling Cloudflare (id={correlation_id}): {source}")]
    Network {
        correlation_id: CorrelationId,
        #[source]
        source: reqwest::Error,
    },
    #[error("Cloudflare purge failed: status={status} id={correlation_id}")]
    Rejected {
        status: u16,
        correlation_id: CorrelationId,
        errors: Option<Value>,
    },
    #[error("cannot build purge endpoint (id={correlation_id}): {reason}")]
    Endpoint {
        correlation_id: CorrelationId,
        reason: String,
    },
}

impl PurgeError {
    pub fn correlation_id(&self) -> &CorrelationId {
        match self {
            Self::Network { correlation_id, .. }
            | Self::Rejected { correlation_id, .. }
            | Self::Endpoint { correlation_id, .. } => correlation_id,
        }
    }

    /// Provider HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Performs one purge attempt.
///
/// Missing credentials are a logged skip, not an error.
#[async_trait]
pub trait PurgeExecutor: Send + Sync {
    async fn execute(
        &self,
        request: &PurgeRequest,
        credentials: Option<&PurgeCredentials>,
        log: LogOptions,
    ) -> Result<PurgeResult, PurgeError>;
}

/// [`PurgeExecutor`] backed by the Cloudflare v4 API.
///
/// No timeout or retry is applied; a hung request holds the calling hook.
#[derive(Debug, Clone)]
pub struct CloudflareExecutor {
    client: Client,
    api_base: Url,
}

impl CloudflareExecutor {
    pub fn new(api_base: Url) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(client, api_base))
    }

    pub fn with_client(client: Client, api_base: Url) -> Self {
        Self { client, api_base }
    }

    /// `{api_base}/client/v4/zones/{zone_id}/purge_cache`
    pub fn purge_url(&self, zone_id: &str) -> Option<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(["client", "v4", "zones", zone_id, "purge_cache"]);
        Some(url)
    }
}

#[async_trait]
impl PurgeExecutor for CloudflareExecutor {
    async fn execute(
        &self,
        request: &PurgeRequest,
        credentials: Option<&PurgeCredentials>,
        log: LogOptions,
    ) -> Result<PurgeResult, PurgeError> {
        let correlation_id = request.correlation_id().clone();
        let scope = request.scope();

        let Some(credentials) = credentials else {
            warn!(
                correlation_id = %correlation_id,
                "Cloudflare credentials missing (zone id or API token); skipping purge"
            );
            counter!(METRIC_PURGE_ATTEMPT_TOTAL, "outcome" => "skipped").increment(1);
            return Ok(PurgeResult::skipped(correlation_id));
        };

        let Some(endpoint) = self.purge_url(credentials.zone_id()) else {
            counter!(METRIC_PURGE_ATTEMPT_TOTAL, "outcome" => "invalid_endpoint").increment(1);
            return Err(PurgeError::Endpoint {
                correlation_id,
                reason: format!("api base `{}` cannot carry a path", self.api_base),
            });
        };

        let body = scope.to_provider_body();
        info!(
            correlation_id = %correlation_id,
            zone_id = %redact(credentials.zone_id()),
            purge_everything = scope.is_everything(),
            files_count = scope.files().len(),
            "Starting Cloudflare purge"
        );
        if log.debug {
            info!(
                correlation_id = %correlation_id,
                endpoint = %endpoint,
                api_token = %redact(credentials.api_token()),
                body = ?body,
                "Cloudflare purge payload"
            );
        }

        let started_at = Instant::now();
        let sent = self
            .client
            .post(endpoint.clone())
            .bearer_auth(credentials.api_token())
            .json(&body)
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(source) => {
                let elapsed = started_at.elapsed();
                error!(
                    correlation_id = %correlation_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %source,
                    "Network failure calling Cloudflare"
                );
                counter!(METRIC_PURGE_ATTEMPT_TOTAL, "outcome" => "network_error").increment(1);
                return Err(PurgeError::Network {
                    correlation_id,
                    source,
                });
            }
        };
        let elapsed = started_at.elapsed();
        histogram!(METRIC_PURGE_REQUEST_MS).record(elapsed.as_secs_f64() * 1000.0);

        let status = response.status();
        // Unparseable bodies are tolerated; the status alone then decides the outcome.
        let provider_response: Option<Value> = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice(&bytes).ok(),
            Err(_) => None,
        };
        let envelope: ProviderEnvelope = provider_response
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();

        info!(
            correlation_id = %correlation_id,
            status = status.as_u16(),
            ok = status.is_success(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Cloudflare response received"
        );
        if log.debug && log.log_provider_json {
            info!(
                correlation_id = %correlation_id,
                response = ?provider_response,
                "Cloudflare response body"
            );
        }

        if !is_confirmed(status, &envelope) {
            error!(
                correlation_id = %correlation_id,
                status = status.as_u16(),
                errors = ?envelope.errors,
                messages = ?envelope.messages,
                "Cloudflare purge was not confirmed"
            );
            counter!(METRIC_PURGE_ATTEMPT_TOTAL, "outcome" => "rejected").increment(1);
            return Err(PurgeError::Rejected {
                status: status.as_u16(),
                correlation_id,
                errors: envelope.errors,
            });
        }

        info!(correlation_id = %correlation_id, "Cloudflare purge completed");
        counter!(METRIC_PURGE_ATTEMPT_TOTAL, "outcome" => "success").increment(1);

        Ok(PurgeResult {
            succeeded: true,
            http_status: status.as_u16(),
            endpoint: Some(endpoint),
            scope_sent: Some(scope.clone()),
            provider_response,
            elapsed,
            correlation_id,
        })
    }
}

/// A 2xx status confirms the purge unless the envelope explicitly says `success: false`.
fn is_confirmed(status: StatusCode, envelope: &ProviderEnvelope) -> bool {
    status.is_success() && envelope.success != Some(false)
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use serde_json::json;

    use super::*;

    fn executor(base: &str) -> CloudflareExecutor {
        CloudflareExecutor::new(Url::parse(base).unwrap()).unwrap()
    }

    fn credentials() -> PurgeCredentials {
        PurgeCredentials::new("zone123", "token-abcdef").unwrap()
    }

    fn files_request() -> PurgeRequest {
        PurgeRequest::new(
            PurgeScope::Files(vec!["https://x.com/a".into()]),
            CorrelationId::generate(),
        )
    }

    #[test]
    fn purge_url_appends_zone_path() {
        let exec = executor("https://api.cloudflare.com");
        assert_eq!(
            exec.purge_url("zone123").unwrap().as_str(),
            "https://api.cloudflare.com/client/v4/zones/zone123/purge_cache"
        );

        let nested = executor("http://127.0.0.1:9000/proxy/");
        assert_eq!(
            nested.purge_url("z").unwrap().as_str(),
            "http://127.0.0.1:9000/proxy/client/v4/zones/z/purge_cache"
        );
    }

    #[tokio::test]
    async fn sends_files_with_bearer_token() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method("POST")
                    .path("/client/v4/zones/zone123/purge_cache")
                    .header("authorization", "Bearer token-abcdef")
                    .json_body(json!({ "files": ["https://x.com/a"] }));
                then.status(200)
                    .json_body(json!({ "success": true, "errors": [], "messages": [] }));
            });

        let request = files_request();
        let result = executor(&server.base_url())
            .execute(&request, Some(&credentials()), LogOptions::default())
            .await
            .expect("purge succeeds");

        mock.assert();
        assert!(result.succeeded);
        assert_eq!(result.http_status, 200);
        assert_eq!(&result.correlation_id, request.correlation_id());
        assert_eq!(result.scope_sent, Some(request.scope().clone()));
        assert_eq!(
            result.provider_response.as_ref().unwrap()["success"],
            json!(true)
        );
    }

    #[tokio::test]
    async fn sends_purge_everything_body() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method("POST")
                    .path("/client/v4/zones/zone123/purge_cache")
                    .json_body(json!({ "purge_everything": true }));
                then.status(200).json_body(json!({ "success": true }));
            });

        let request = PurgeRequest::new(PurgeScope::Everything, CorrelationId::generate());
        let result = executor(&server.base_url())
            .execute(&request, Some(&credentials()), LogOptions::default())
            .await
            .unwrap();

        mock.assert();
        assert!(result.succeeded);
    }

    #[tokio::test]
    async fn missing_credentials_skip_without_network() {
        let result = executor("http://127.0.0.1:1")
            .execute(&files_request(), None, LogOptions::default())
            .await
            .unwrap();

        assert!(!result.succeeded);
        assert!(result.is_skipped());
        assert_eq!(result.http_status, 0);
        assert!(result.endpoint.is_none());
    }

    #[tokio::test]
    async fn explicit_failure_in_body_is_rejected() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method("POST");
                then.status(200).json_body(json!({
                    "success": false,
                    "errors": [{ "code": 1012, "message": "bad request" }]
                }));
            });

        let request = files_request();
        let err = executor(&server.base_url())
            .execute(&request, Some(&credentials()), LogOptions::default())
            .await
            .unwrap_err();

        match &err {
            PurgeError::Rejected { status, errors, .. } => {
                assert_eq!(*status, 200);
                assert_eq!(errors.as_ref().unwrap()[0]["code"], json!(1012));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.correlation_id(), request.correlation_id());
        assert!(err.to_string().contains("status=200"));
    }

    #[tokio::test]
    async fn non_success_status_with_unparseable_body_is_rejected() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method("POST");
                then.status(403).body("forbidden");
            });

        let err = executor(&server.base_url())
            .execute(&files_request(), Some(&credentials()), LogOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn success_status_without_json_body_is_confirmed() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method("POST");
                then.status(200).body("ok");
            });

        let result = executor(&server.base_url())
            .execute(&files_request(), Some(&credentials()), LogOptions::default())
            .await
            .unwrap();
        assert!(result.succeeded);
        assert!(result.provider_response.is_none());
    }

    #[tokio::test]
    async fn connection_failure_is_a_network_error() {
        let err = executor("http://127.0.0.1:1")
            .execute(&files_request(), Some(&credentials()), LogOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PurgeError::Network { .. }));
    }
}
