//! Admin "purge everything" control.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

use crate::host::{EndpointHandler, EndpointRequest, HostUser};

/// Role allowed to trigger a full-zone purge from the admin UI.
pub const ADMIN_ROLE: &str = "admin";

/// Component id registered in the host's `after_dashboard` slot.
pub const PURGE_BUTTON_COMPONENT: &str = "cloudflare-purge#PurgeEverythingButton";

#[derive(Debug, Error)]
pub enum AdminPurgeError {
    #[error("purging everything requires the `admin` role")]
    Forbidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminPurgeOutcome {
    Purged { correlation_id: String },
    /// The endpoint accepted the call but nothing reached the provider (missing credentials).
    Skipped { correlation_id: String },
    Failed {
        status: StatusCode,
        message: String,
        correlation_id: String,
    },
}

impl AdminPurgeOutcome {
    /// Operator-facing notification text.
    pub fn message(&self) -> String {
        match self {
            Self::Purged { correlation_id } => format!("Cache purged (id: {correlation_id})"),
            Self::Skipped { correlation_id } => {
                format!("Purge skipped: Cloudflare credentials are not configured (id: {correlation_id})")
            }
            Self::Failed {
                message,
                correlation_id,
                ..
            } => format!("Purge failed: {message} (id: {correlation_id})"),
        }
    }
}

/// Posts `{ "purgeEverything": true }` to the purge endpoint on behalf of an admin.
#[derive(Clone)]
pub struct PurgeEverythingControl {
    endpoint: Arc<dyn EndpointHandler>,
}

impl PurgeEverythingControl {
    pub fn new(endpoint: Arc<dyn EndpointHandler>) -> Self {
        Self { endpoint }
    }

    /// The control renders only for admins.
    pub fn is_visible_to(user: Option<&HostUser>) -> bool {
        user.is_some_and(|user| user.has_role(ADMIN_ROLE))
    }

    pub async fn trigger(&self, user: Option<HostUser>) -> Result<AdminPurgeOutcome, AdminPurgeError> {
        let Some(user) = user.filter(|user| user.has_role(ADMIN_ROLE)) else {
            warn!("Purge everything requested without the admin role");
            return Err(AdminPurgeError::Forbidden);
        };

        info!(user_id = %user.id, "Admin requested purge everything");
        let response = self
            .endpoint
            .handle(EndpointRequest {
                user: Some(user),
                body: json!({ "purgeEverything": true }),
                ..EndpointRequest::default()
            })
            .await;

        let correlation_id = response
            .body
            .get("correlationId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if !response.is_success() {
            let message = response
                .body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            warn!(
                correlation_id = %correlation_id,
                status = response.status.as_u16(),
                error = %message,
                "Admin purge everything failed"
            );
            return Ok(AdminPurgeOutcome::Failed {
                status: response.status,
                message,
                correlation_id,
            });
        }

        let succeeded = response
            .body
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(if succeeded {
            AdminPurgeOutcome::Purged { correlation_id }
        } else {
            AdminPurgeOutcome::Skipped { correlation_id }
        })
    }
}
