use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use axum::{Extension, Json, Router};
use serde_json::Value;
use tracing::warn;

use crate::host::{EndpointHandler, EndpointMethod, EndpointRegistration, EndpointRequest};

use super::ServerState;
use super::auth::Session;
use super::error::ErrorReport;

/// Mount host-registered endpoints. The first registration of a path and method wins.
pub(super) fn mount(
    mut router: Router<ServerState>,
    endpoints: &[EndpointRegistration],
) -> Router<ServerState> {
    let mut seen = HashSet::new();
    let mut routes: BTreeMap<String, MethodRouter<ServerState>> = BTreeMap::new();

    for registration in endpoints {
        let path = normalize_path(&registration.path);
        if !seen.insert((path.clone(), registration.method)) {
            warn!(
                path = %path,
                method = registration.method.as_str(),
                "Duplicate endpoint registration ignored"
            );
            continue;
        }

        let handler = registration.handler.clone();
        let route = move |Extension(session): Extension<Session>, headers: HeaderMap, body: Bytes| {
            let handler = handler.clone();
            async move { dispatch(handler, session, headers, body).await }
        };
        let method_router = routes.remove(&path).unwrap_or_else(MethodRouter::new);
        routes.insert(
            path,
            method_router.on(method_filter(registration.method), route),
        );
    }

    for (path, method_router) in routes {
        router = router.route(&path, method_router);
    }
    router
}

async fn dispatch(
    handler: Arc<dyn EndpointHandler>,
    session: Session,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = if body.is_empty() {
        Value::Null
    } else {
        // Non-JSON bodies pass through as a string so the endpoint rejects them after authorization.
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };

    let result = handler
        .handle(EndpointRequest {
            user: session.user,
            headers,
            body,
        })
        .await;

    let detail = (!result.is_success()).then(|| {
        result
            .body
            .get("details")
            .or_else(|| result.body.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("endpoint reported failure")
            .to_string()
    });
    let mut response = (result.status, Json(result.body)).into_response();
    if let Some(detail) = detail {
        ErrorReport::from_message("infra::http::endpoints", result.status, detail)
            .attach(&mut response);
    }
    response
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn method_filter(method: EndpointMethod) -> MethodFilter {
    match method {
        EndpointMethod::Get => MethodFilter::GET,
        EndpointMethod::Post => MethodFilter::POST,
        EndpointMethod::Patch => MethodFilter::PATCH,
        EndpointMethod::Delete => MethodFilter::DELETE,
    }
}
