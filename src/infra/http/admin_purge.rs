use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;

use crate::purge::{AdminPurgeError, AdminPurgeOutcome};

use super::ServerState;
use super::auth::Session;
use super::error::{ApiError, ErrorReport, codes};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminPurgeResponse {
    success: bool,
    message: String,
    correlation_id: String,
}

/// `POST /admin/cloudflare-purge/everything`: the dashboard "purge everything" button.
pub(super) async fn purge_everything(
    State(state): State<ServerState>,
    Extension(session): Extension<Session>,
) -> Response {
    let Some(control) = state.admin.as_ref() else {
        return ApiError::not_found("Purge control is not enabled", None).into_response();
    };
    if session.user.is_none() {
        return ApiError::unauthorized().into_response();
    }

    let outcome = match control.trigger(session.user).await {
        Ok(outcome) => outcome,
        Err(err @ AdminPurgeError::Forbidden) => {
            return ApiError::forbidden(Some(err.to_string())).into_response();
        }
    };

    let message = outcome.message();
    match outcome {
        AdminPurgeOutcome::Purged { correlation_id } => Json(AdminPurgeResponse {
            success: true,
            message,
            correlation_id,
        })
        .into_response(),
        AdminPurgeOutcome::Skipped { correlation_id } => Json(AdminPurgeResponse {
            success: false,
            message,
            correlation_id,
        })
        .into_response(),
        AdminPurgeOutcome::Failed {
            status,
            correlation_id,
            ..
        } => {
            let mut response = (
                StatusCode::BAD_GATEWAY,
                Json(AdminPurgeResponse {
                    success: false,
                    message: message.clone(),
                    correlation_id,
                }),
            )
                .into_response();
            ErrorReport::from_message(
                "infra::http::admin_purge",
                StatusCode::BAD_GATEWAY,
                format!("{}: endpoint status {status}: {message}", codes::PURGE_FAILED),
            )
            .attach(&mut response);
            response
        }
    }
}
