use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use httpmock::MockServer;
use serde_json::{Value, json};
use tower::ServiceExt;

use cloudflare_purge::config::SessionToken;
use cloudflare_purge::host::{CollectionConfig, GlobalConfig, HostConfig, HostUser};
use cloudflare_purge::infra::http::{ServerState, SessionAuthenticator, build_router};
use cloudflare_purge::purge::{CloudflarePurgePlugin, PurgeOptions, TargetSelection};

const ADMIN_TOKEN: &str = "admin-token";
const EDITOR_TOKEN: &str = "editor-token";

fn options(api_base: &str, use_endpoint: bool) -> PurgeOptions {
    let mut options = PurgeOptions::new();
    options.enabled = Some(true);
    options.zone_id = Some("zone123".into());
    options.api_token = Some("cf-token-abcdef".into());
    options.api_base = Some(api_base.into());
    options.base_url = Some("https://site.test".into());
    options.collections = Some(TargetSelection::All);
    options.globals = Some(TargetSelection::slugs(["header"]));
    options.show_purge_everything_button = Some(true);
    options.use_endpoint = Some(use_endpoint);
    options
}

fn host() -> HostConfig {
    HostConfig {
        collections: vec![
            CollectionConfig::new("posts").with_drafts(true),
            CollectionConfig::new("media"),
        ],
        globals: vec![GlobalConfig::new("header"), GlobalConfig::new("footer")],
        ..HostConfig::default()
    }
}

fn router(options: PurgeOptions) -> Router {
    let plugin = CloudflarePurgePlugin::from_options(options).expect("plugin builds");
    let host = plugin.apply(host());
    let auth = SessionAuthenticator::new(vec![
        SessionToken {
            token: ADMIN_TOKEN.into(),
            user: HostUser::new("root", ["admin"]),
        },
        SessionToken {
            token: EDITOR_TOKEN.into(),
            user: HostUser::new("editor", ["editor"]),
        },
    ]);
    build_router(ServerState {
        host: Arc::new(host),
        auth,
        admin: plugin.admin_control(),
    })
}

fn post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

#[tokio::test]
async fn purge_endpoint_requires_a_session() {
    let server = MockServer::start();
    let provider = server.mock(|when, then| {
        when.method("POST");
        then.status(200).json_body(json!({ "success": true }));
    });
    let router = router(options(&server.base_url(), true));

    let (status, body) = send(
        &router,
        post(
            "/api/cloudflare-purge",
            None,
            json!({ "files": ["https://site.test/a"] }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
    assert!(body["correlationId"].as_str().is_some());
    provider.assert_calls(0);
}

#[tokio::test]
async fn purge_endpoint_forwards_files_to_provider() {
    let server = MockServer::start();
    let provider = server.mock(|when, then| {
        when.method("POST")
            .path("/client/v4/zones/zone123/purge_cache")
            .header("authorization", "Bearer cf-token-abcdef")
            .json_body(json!({ "files": ["https://site.test/a", "https://site.test/b"] }));
        then.status(200)
            .json_body(json!({ "success": true, "errors": [], "messages": [] }));
    });
    let router = router(options(&server.base_url(), true));

    let (status, body) = send(
        &router,
        post(
            "/api/cloudflare-purge",
            Some(EDITOR_TOKEN),
            json!({ "files": ["https://site.test/a", "https://site.test/b"] }),
        ),
    )
    .await;

    provider.assert();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["details"]["status"], 200);
    assert_eq!(body["details"]["filesPurged"], 2);
    assert_eq!(body["details"]["purgeEverything"], false);
    assert!(body.get("cloudflareResponse").is_none());
}

#[tokio::test]
async fn purge_endpoint_reports_provider_rejection() {
    let server = MockServer::start();
    let provider = server.mock(|when, then| {
        when.method("POST")
            .path("/client/v4/zones/zone123/purge_cache");
        then.status(400).json_body(json!({
            "success": false,
            "errors": [{ "code": 1012, "message": "Request must contain one of files" }]
        }));
    });
    let router = router(options(&server.base_url(), true));

    let (status, body) = send(
        &router,
        post(
            "/api/cloudflare-purge",
            Some(EDITOR_TOKEN),
            json!({ "purgeEverything": true }),
        ),
    )
    .await;

    provider.assert();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Purge failed");
    assert!(
        body["details"]
            .as_str()
            .is_some_and(|details| details.contains("400"))
    );
}

#[tokio::test]
async fn publishing_a_draft_purges_its_url_through_the_endpoint() {
    let server = MockServer::start();
    let provider = server.mock(|when, then| {
        when.method("POST")
            .path("/client/v4/zones/zone123/purge_cache")
            .json_body(json!({ "files": ["https://site.test/hello"] }));
        then.status(200).json_body(json!({ "success": true }));
    });
    let router = router(options(&server.base_url(), true));

    let (status, body) = send(
        &router,
        post(
            "/api/events",
            Some(EDITOR_TOKEN),
            json!({
                "collection": "posts",
                "operation": "update",
                "doc": { "id": 7, "slug": "hello", "_status": "published" },
                "previousDoc": { "id": 7, "slug": "hello", "_status": "draft" }
            }),
        ),
    )
    .await;

    provider.assert();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doc"]["slug"], "hello");
}

#[tokio::test]
async fn saving_a_draft_does_not_purge() {
    let server = MockServer::start();
    let provider = server.mock(|when, then| {
        when.method("POST");
        then.status(200).json_body(json!({ "success": true }));
    });
    let router = router(options(&server.base_url(), false));

    let (status, _) = send(
        &router,
        post(
            "/api/events",
            Some(EDITOR_TOKEN),
            json!({
                "collection": "posts",
                "operation": "update",
                "doc": { "id": 7, "slug": "hello", "_status": "draft" },
                "previousDoc": { "id": 7, "slug": "hello", "_status": "draft" }
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    provider.assert_calls(0);
}

#[tokio::test]
async fn direct_mode_global_change_purges_and_registers_no_endpoint() {
    let server = MockServer::start();
    let provider = server.mock(|when, then| {
        when.method("POST")
            .path("/client/v4/zones/zone123/purge_cache")
            .json_body(json!({ "files": ["https://site.test/"] }));
        then.status(200).json_body(json!({ "success": true }));
    });
    let router = router(options(&server.base_url(), false));

    let (status, _) = send(
        &router,
        post(
            "/api/events",
            Some(EDITOR_TOKEN),
            json!({ "global": "header", "operation": "update", "doc": { "title": "Site" } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    provider.assert();

    let (status, _) = send(
        &router,
        post("/api/cloudflare-purge", Some(EDITOR_TOKEN), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unselected_global_is_left_alone() {
    let server = MockServer::start();
    let provider = server.mock(|when, then| {
        when.method("POST");
        then.status(200).json_body(json!({ "success": true }));
    });
    let router = router(options(&server.base_url(), false));

    let (status, _) = send(
        &router,
        post(
            "/api/events",
            Some(EDITOR_TOKEN),
            json!({ "global": "footer", "operation": "update", "doc": {} }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    provider.assert_calls(0);
}

#[tokio::test]
async fn provider_failure_surfaces_as_hook_failure() {
    let server = MockServer::start();
    let provider = server.mock(|when, then| {
        when.method("POST");
        then.status(500).json_body(json!({ "success": false }));
    });
    let router = router(options(&server.base_url(), false));

    let (status, body) = send(
        &router,
        post(
            "/api/events",
            Some(EDITOR_TOKEN),
            json!({ "collection": "media", "operation": "delete", "doc": { "id": "m1" } }),
        ),
    )
    .await;

    provider.assert();
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "hook_failed");
}

#[tokio::test]
async fn event_bridge_rejects_unknown_targets() {
    let router = router(options("http://127.0.0.1:9", false));

    let (status, _) = send(
        &router,
        post(
            "/api/events",
            Some(EDITOR_TOKEN),
            json!({ "collection": "nope", "operation": "create", "doc": {} }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &router,
        post(
            "/api/events",
            Some(EDITOR_TOKEN),
            json!({ "global": "header", "operation": "delete", "doc": {} }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &router,
        post(
            "/api/events",
            None,
            json!({ "collection": "posts", "operation": "create", "doc": {} }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_control_requires_admin_role() {
    let server = MockServer::start();
    let provider = server.mock(|when, then| {
        when.method("POST")
            .path("/client/v4/zones/zone123/purge_cache")
            .json_body(json!({ "purge_everything": true }));
        then.status(200).json_body(json!({ "success": true }));
    });
    let router = router(options(&server.base_url(), true));

    let (status, _) = send(
        &router,
        post("/admin/cloudflare-purge/everything", Some(EDITOR_TOKEN), Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    provider.assert_calls(0);

    let (status, body) = send(
        &router,
        post("/admin/cloudflare-purge/everything", Some(ADMIN_TOKEN), Value::Null),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(
        body["message"]
            .as_str()
            .is_some_and(|message| message.starts_with("Cache purged (id: "))
    );
    provider.assert();
}

#[tokio::test]
async fn health_probe_answers_without_session() {
    let router = router(options("http://127.0.0.1:9", true));
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("request builds");
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn admin_control_failure_carries_correlation_id() {
    let server = MockServer::start();
    let provider = server.mock(|when, then| {
        when.method("POST")
            .path("/client/v4/zones/zone123/purge_cache");
        then.status(500).json_body(json!({ "success": false }));
    });
    let router = router(options(&server.base_url(), true));

    let (status, body) = send(
        &router,
        post("/admin/cloudflare-purge/everything", Some(ADMIN_TOKEN), Value::Null),
    )
    .await;

    provider.assert();
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    let correlation_id = body["correlationId"].as_str().expect("correlation id");
    assert!(!correlation_id.is_empty());
    assert!(
        body["message"]
            .as_str()
            .is_some_and(|message| message.ends_with(&format!("(id: {correlation_id})")))
    );
}
