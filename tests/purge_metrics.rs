use std::collections::HashSet;
use std::sync::Arc;

use axum::http::StatusCode;
use httpmock::MockServer;
use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;

use cloudflare_purge::host::{EndpointHandler, EndpointRequest, HostUser};
use cloudflare_purge::purge::{CloudflarePurgePlugin, PurgeOptions};

#[tokio::test]
async fn purge_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let server = MockServer::start();
    let provider = server.mock(|when, then| {
        when.method("POST")
            .path("/client/v4/zones/zone123/purge_cache");
        then.status(200).json_body(json!({ "success": true }));
    });

    let mut options = PurgeOptions::new();
    options.zone_id = Some("zone123".into());
    options.api_token = Some("cf-token-abcdef".into());
    options.api_base = Some(server.base_url());
    let plugin = CloudflarePurgePlugin::from_options(options).expect("plugin builds");
    let endpoint: Arc<dyn EndpointHandler> = plugin.endpoint();

    let response = endpoint
        .handle(EndpointRequest {
            user: Some(HostUser::new("editor", ["editor"])),
            body: json!({ "files": ["https://site.test/a"] }),
            ..EndpointRequest::default()
        })
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = endpoint.handle(EndpointRequest::default()).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    provider.assert();

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "cloudflare_purge_attempt_total",
        "cloudflare_purge_request_ms",
        "cloudflare_purge_endpoint_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
