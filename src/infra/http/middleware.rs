use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{error, warn};
use uuid::Uuid;

use super::auth::Session;
use super::error::ErrorReport;

/// Per-request id, shared by every log line about one HTTP call.
#[derive(Clone)]
pub struct RequestId(pub String);

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    request
        .extensions_mut()
        .insert(RequestId(Uuid::new_v4().to_string()));
    next.run(request).await
}

/// Log 4xx/5xx responses with the attached [`ErrorReport`] and the session user.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    // The session is resolved inside this layer, so it is read back from the response.
    let user_id = response
        .extensions()
        .get::<Session>()
        .and_then(|session| session.user.as_ref())
        .map(|user| user.id.clone())
        .unwrap_or_default();
    let (source, detail) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages.join(": ")),
        None => ("unrouted", String::new()),
    };
    let elapsed_ms = start.elapsed().as_millis() as u64;

    if status.is_server_error() {
        error!(
            target: "cloudflare_purge::http",
            status = status.as_u16(),
            %method,
            %path,
            elapsed_ms,
            source,
            %detail,
            %request_id,
            %user_id,
            "request failed"
        );
    } else {
        warn!(
            target: "cloudflare_purge::http",
            status = status.as_u16(),
            %method,
            %path,
            elapsed_ms,
            source,
            %detail,
            %request_id,
            %user_id,
            "request rejected"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Router, middleware as axum_middleware};
    use tower::ServiceExt;

    use super::*;

    async fn failing() -> Response {
        let mut response = StatusCode::BAD_GATEWAY.into_response();
        ErrorReport::from_message("test", StatusCode::BAD_GATEWAY, "upstream down")
            .attach(&mut response);
        response
    }

    async fn request_id(request: Request<Body>) -> String {
        request
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default()
    }

    fn router() -> Router {
        Router::new()
            .route("/fail", get(failing))
            .route("/id", get(request_id))
            .layer(axum_middleware::from_fn(log_responses))
            .layer(axum_middleware::from_fn(set_request_context))
    }

    #[tokio::test]
    async fn error_reports_are_consumed_and_status_kept() {
        let response = router()
            .oneshot(Request::get("/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.extensions().get::<ErrorReport>().is_none());
    }

    #[tokio::test]
    async fn handlers_see_a_request_id() {
        let response = router()
            .oneshot(Request::get("/id").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();

        assert!(uuid::Uuid::parse_str(std::str::from_utf8(&body).unwrap()).is_ok());
    }
}
