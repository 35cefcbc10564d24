//! Shared wire types for the purge endpoint, the event bridge, and the
//! Cloudflare `purge_cache` API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Header that marks an in-process call from an installed hook.
pub const INTERNAL_CALL_HEADER: &str = "x-internal-call";

/// Path the purge endpoint is registered under, relative to the host API root.
pub const PURGE_ENDPOINT_PATH: &str = "/cloudflare-purge";

/// Body accepted by `POST /cloudflare-purge`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeEndpointRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purge_everything: Option<bool>,
}

/// Successful endpoint response (HTTP 200).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeEndpointResponse {
    pub success: bool,
    pub correlation_id: String,
    pub details: PurgeDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudflare_response: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeDetails {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_purged: Option<usize>,
    pub purge_everything: bool,
    /// Wall-clock time of the provider call, formatted as `"<n>ms"`.
    pub execution_time: String,
}

/// Error body for 400/401/500 endpoint responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeErrorResponse {
    pub error: String,
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Body sent to `POST /client/v4/zones/{zone_id}/purge_cache`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderPurgeBody {
    Everything { purge_everything: bool },
    Files { files: Vec<String> },
}

/// The parts of the provider's response envelope that drive success and diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub errors: Option<Value>,
    #[serde(default)]
    pub messages: Option<Value>,
}

/// Lifecycle operation as carried on the event bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireOperation {
    Create,
    Update,
    Delete,
}

/// Body accepted by `POST /events`: one lifecycle event from an external CMS.
///
/// Exactly one of `collection` or `global` names the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEventBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<String>,
    pub operation: WireOperation,
    pub doc: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_doc: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn provider_body_shapes() {
        let everything = ProviderPurgeBody::Everything {
            purge_everything: true,
        };
        assert_eq!(
            serde_json::to_value(&everything).unwrap(),
            json!({ "purge_everything": true })
        );

        let files = ProviderPurgeBody::Files {
            files: vec!["https://x.com/a".into()],
        };
        assert_eq!(
            serde_json::to_value(&files).unwrap(),
            json!({ "files": ["https://x.com/a"] })
        );
    }

    #[test]
    fn endpoint_request_accepts_partial_bodies() {
        let req: PurgeEndpointRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req, PurgeEndpointRequest::default());

        let req: PurgeEndpointRequest =
            serde_json::from_value(json!({ "purgeEverything": true })).unwrap();
        assert_eq!(req.purge_everything, Some(true));
        assert!(req.files.is_none());
    }

    #[test]
    fn debug_body_is_omitted_when_absent() {
        let response = PurgeEndpointResponse {
            success: true,
            correlation_id: "abc".into(),
            details: PurgeDetails {
                status: 200,
                files_purged: Some(1),
                purge_everything: false,
                execution_time: "12ms".into(),
            },
            cloudflare_response: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("cloudflareResponse").is_none());
        assert_eq!(value["details"]["executionTime"], "12ms");
        assert_eq!(value["correlationId"], "abc");
    }
}
