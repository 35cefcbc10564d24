use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use cloudflare_purge_api_types::{ChangeEventBody, WireOperation};
use serde_json::json;
use tracing::info;

use crate::domain::{ChangeOperation, Document};
use crate::host::{HookError, HookRequest};

use super::ServerState;
use super::auth::Session;
use super::error::{ApiError, ErrorReport, codes};

/// `POST /api/events`: run the host hook chain for a change committed by an external CMS.
pub(super) async fn receive_event(
    State(state): State<ServerState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    payload: Result<Json<ChangeEventBody>, JsonRejection>,
) -> Response {
    if session.user.is_none() {
        return ApiError::unauthorized().into_response();
    }

    let Json(event) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return ApiError::bad_request("Invalid event body", Some(rejection.body_text()))
                .into_response();
        }
    };

    let operation = match event.operation {
        WireOperation::Create => ChangeOperation::Create,
        WireOperation::Update => ChangeOperation::Update,
        WireOperation::Delete => ChangeOperation::Delete,
    };
    let req = HookRequest {
        user: session.user,
        locale: event.locale,
        headers,
    };
    let doc = Document::new(event.doc);
    let previous_doc = event.previous_doc.map(Document::new);

    let result = match (event.collection.as_deref(), event.global.as_deref()) {
        (Some(slug), None) => {
            let Some(collection) = state.host.collection(slug) else {
                return ApiError::not_found("Unknown collection", Some(slug.to_string()))
                    .into_response();
            };
            info!(collection = slug, operation = operation.as_str(), "Change event received");
            match operation {
                ChangeOperation::Delete => collection.after_delete(req, doc).await,
                _ => {
                    collection
                        .after_change(req, operation, doc, previous_doc)
                        .await
                }
            }
        }
        (None, Some(slug)) => {
            let Some(global) = state.host.global(slug) else {
                return ApiError::not_found("Unknown global", Some(slug.to_string()))
                    .into_response();
            };
            if operation == ChangeOperation::Delete {
                return ApiError::bad_request("Globals cannot be deleted", Some(slug.to_string()))
                    .into_response();
            }
            info!(global = slug, operation = operation.as_str(), "Change event received");
            global.after_change(req, doc, previous_doc).await
        }
        _ => {
            return ApiError::bad_request(
                "Exactly one of `collection` or `global` is required",
                None,
            )
            .into_response();
        }
    };

    match result {
        Ok(doc) => (StatusCode::OK, Json(json!({ "doc": doc }))).into_response(),
        Err(err) => hook_failure(&err),
    }
}

fn hook_failure(err: &HookError) -> Response {
    let mut response = ApiError::new(
        StatusCode::BAD_GATEWAY,
        codes::HOOK_FAILED,
        "Hook chain failed",
        Some(err.to_string()),
    )
    .into_response();
    ErrorReport::from_error("infra::http::events", StatusCode::BAD_GATEWAY, err)
        .attach(&mut response);
    response
}
