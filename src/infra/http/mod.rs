//! HTTP surface of the standalone service.
//!
//! - `/api/*`: host endpoints (the purge endpoint among them) and the event bridge
//! - `/admin/cloudflare-purge/everything`: admin "purge everything" control
//! - `/health`: liveness probe

mod admin_purge;
mod auth;
mod endpoints;
mod error;
mod events;
mod middleware;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Router, middleware as axum_middleware};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::host::HostConfig;
use crate::purge::PurgeEverythingControl;

use super::error::InfraError;

pub use auth::{Session, SessionAuthenticator};
pub use error::{ApiError, ErrorReport};

#[derive(Clone)]
pub struct ServerState {
    pub host: Arc<HostConfig>,
    pub auth: SessionAuthenticator,
    pub admin: Option<PurgeEverythingControl>,
}

pub fn build_router(state: ServerState) -> Router {
    let api = Router::new().route("/events", post(events::receive_event));
    let api = endpoints::mount(api, &state.host.endpoints);

    Router::new()
        .nest("/api", api)
        .route(
            "/admin/cloudflare-purge/everything",
            post(admin_purge::purge_everything),
        )
        .route("/health", get(health))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_session,
        ))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
        .with_state(state)
}

async fn health() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Serve until ctrl-c, then give in-flight requests up to `graceful_shutdown` to finish.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    graceful_shutdown: Duration,
) -> Result<(), InfraError> {
    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received; draining connections");
            }
            signal.notify_one();
        })
        .into_future();

    tokio::select! {
        result = server => result.map_err(InfraError::from),
        _ = async {
            shutdown.notified().await;
            tokio::time::sleep(graceful_shutdown).await;
        } => {
            warn!(
                timeout_secs = graceful_shutdown.as_secs(),
                "Graceful shutdown timed out; dropping remaining connections"
            );
            Ok(())
        }
    }
}
