//! HTTP integration tests for the Verdict REST API
//!
//! Full end-to-end handler dispatch through the Axum router with `oneshot`.
//! The model is a `ScriptedBackend` and the review log lives in a temp dir,
//! so these run without network access.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use verdict_core::config::{HttpConfig, ModelConfig, ServiceConfig, StoreConfig};
use verdict_core::{ReviewStore, ScriptedBackend, VerdictConfig};
use verdict_server::http::{build_router, HttpState};

struct TestApp {
    dir: PathBuf,
    app: Router,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn make_app(backend: ScriptedBackend) -> TestApp {
    let dir = std::env::temp_dir().join(format!("verdict-it-{}", Uuid::new_v4()));
    let path = dir.join("feedback_log.csv").to_string_lossy().into_owned();
    let config = VerdictConfig {
        service: ServiceConfig {
            log_level: "info".to_string(),
        },
        model: ModelConfig {
            backend: "scripted".to_string(),
            ..ModelConfig::default()
        },
        store: StoreConfig { path: path.clone() },
        http: HttpConfig::default(),
    };
    let state = HttpState::new(config, Arc::new(backend), ReviewStore::open(&path));
    TestApp {
        dir,
        app: build_router(Arc::new(state)),
    }
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ===========================================================================
// TEST 1: GET /version - returns version and protocol
// ===========================================================================
#[tokio::test]
async fn test_version_endpoint() {
    let t = make_app(ScriptedBackend::new(Vec::<String>::new()));
    let (status, body) = send(&t.app, "GET", "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["version"].is_string());
    assert_eq!(body["protocol"], "verdict/1");
}

// ===========================================================================
// TEST 2: POST /feedback - model reply wrapped in prose is interpreted
// ===========================================================================
#[tokio::test]
async fn test_feedback_submission_flow() {
    let reply = r#"Of course! Here is the JSON:
{"user_response": "We're thrilled you liked it!", "summary": "Loved the food.", "actions": "Keep the menu"}
Hope this helps."#;
    let t = make_app(ScriptedBackend::new(vec![reply]));

    let (status, body) = send(
        &t.app,
        "POST",
        "/feedback",
        Some(json!({ "rating": 5, "review": "Great food!" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {:?}", body);
    assert_eq!(body["feedback"]["user_response"], "We're thrilled you liked it!");
    assert_eq!(body["feedback"]["summary"], "Loved the food.");
    assert_eq!(body["feedback"]["actions"], json!(["Keep the menu"]));

    let (status, list) = send(&t.app, "GET", "/reviews", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(|a| a.len()), Some(1));
    assert_eq!(list[0]["id"], body["id"]);
    assert_eq!(list[0]["ai_response"], "We're thrilled you liked it!");
}

// ===========================================================================
// TEST 3: POST /feedback - missing fields fall back to defaults
// ===========================================================================
#[tokio::test]
async fn test_feedback_defaults_applied() {
    let t = make_app(ScriptedBackend::new(vec![r#"{"summary": "ok"}"#]));
    let (status, body) = send(
        &t.app,
        "POST",
        "/feedback",
        Some(json!({ "rating": 3, "review": "" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feedback"]["user_response"], "Thank you for your feedback!");
    assert_eq!(body["feedback"]["summary"], "ok");
    assert_eq!(body["feedback"]["actions"], json!([]));
}

// ===========================================================================
// TEST 4: POST /feedback - service error gives generic message, nothing stored
// ===========================================================================
#[tokio::test]
async fn test_feedback_service_error() {
    let backend = ScriptedBackend::new(Vec::<String>::new()).with_failure(503, "Model is loading");
    let t = make_app(backend);

    let (status, body) = send(
        &t.app,
        "POST",
        "/feedback",
        Some(json!({ "rating": 1, "review": "Awful" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["status"], "error");
    assert!(!body["error"].as_str().unwrap().contains("Model is loading"));

    let (_, stats) = send(&t.app, "GET", "/stats", None).await;
    assert_eq!(stats["total"], 0);
}

// ===========================================================================
// TEST 5: review CRUD through the router
// ===========================================================================
#[tokio::test]
async fn test_review_crud_endpoints() {
    let t = make_app(ScriptedBackend::new(Vec::<String>::new()));

    let (status, created) = send(
        &t.app,
        "POST",
        "/reviews",
        Some(json!({ "rating": 4, "review": "Nice", "ai_response": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &t.app,
        "PUT",
        &format!("/reviews/{}", id),
        Some(json!({ "rating": 2, "ai_response": "Sorry to hear" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["rating"], 2);
    assert_eq!(updated["review"], "Nice");
    assert_eq!(updated["ai_response"], "Sorry to hear");

    let (status, _) = send(
        &t.app,
        "PUT",
        &format!("/reviews/{}", id),
        Some(json!({ "rating": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, deleted) = send(&t.app, "DELETE", &format!("/reviews/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["id"], id.as_str());

    let (status, _) = send(&t.app, "DELETE", &format!("/reviews/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// TEST 6: POST /reviews with an unparseable timestamp is rejected
// ===========================================================================
#[tokio::test]
async fn test_add_review_rejects_bad_timestamp() {
    let t = make_app(ScriptedBackend::empty());

    let (status, body) = send(
        &t.app,
        "POST",
        "/reviews",
        Some(json!({ "rating": 3, "review": "Late entry", "timestamp": "not a time" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, created) = send(
        &t.app,
        "POST",
        "/reviews",
        Some(json!({ "rating": 5, "review": "Fresh" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, stats) = send(&t.app, "GET", "/stats", None).await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["latest_submission"], created["timestamp"]);
}

// ===========================================================================
// TEST 7: POST /reply - plain text reply, nothing stored
// ===========================================================================
#[tokio::test]
async fn test_reply_endpoint() {
    let t = make_app(ScriptedBackend::new(vec!["We're glad you liked the pastries!"]));

    let (status, body) = send(
        &t.app,
        "POST",
        "/reply",
        Some(json!({ "rating": 5, "review": "Great pastries" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "We're glad you liked the pastries!");

    let (_, reviews) = send(&t.app, "GET", "/reviews", None).await;
    assert_eq!(reviews.as_array().map(Vec::len), Some(0));
}

// ===========================================================================
// TEST 8: GET /stats and POST /analyze over stored reviews
// ===========================================================================
#[tokio::test]
async fn test_stats_and_analyze() {
    let analysis = "SUMMARY: Food praised, waits criticised. ACTIONS: - Add staff\n- Track waits";
    let t = make_app(ScriptedBackend::new(vec![analysis]));

    for (rating, review) in [(5, "Tasty"), (2, "Slow service")] {
        let (status, _) = send(
            &t.app,
            "POST",
            "/reviews",
            Some(json!({ "rating": rating, "review": review })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, stats) = send(&t.app, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["average_rating"], 3.5);

    let (status, report) = send(&t.app, "POST", "/analyze", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["summary"], "Food praised, waits criticised.");
    assert_eq!(report["actions"], "- Add staff\n- Track waits");
}

// ===========================================================================
// TEST 9: GET /health - healthy with scripted backend
// ===========================================================================
#[tokio::test]
async fn test_health_endpoint() {
    let t = make_app(ScriptedBackend::new(Vec::<String>::new()));
    let (status, body) = send(&t.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "scripted");
}
