//! Custom endpoints registered on the host API.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use serde::Serialize;
use serde_json::Value;

use super::user::HostUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl EndpointMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// A request as the host delivers it to an endpoint handler.
///
/// The host has already resolved the session user (if any); the body is
/// the raw JSON payload, `Value::Null` when none was sent.
#[derive(Debug, Clone, Default)]
pub struct EndpointRequest {
    pub user: Option<HostUser>,
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct EndpointResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl EndpointResponse {
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        let body = serde_json::to_value(body).unwrap_or(Value::Null);
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[async_trait]
pub trait EndpointHandler: Send + Sync {
    async fn handle(&self, request: EndpointRequest) -> EndpointResponse;
}

#[derive(Clone)]
pub struct EndpointRegistration {
    pub path: String,
    pub method: EndpointMethod,
    pub handler: Arc<dyn EndpointHandler>,
}

impl fmt::Debug for EndpointRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointRegistration")
            .field("path", &self.path)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}
