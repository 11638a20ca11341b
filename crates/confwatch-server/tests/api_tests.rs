//! API tests driving the router in-process.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use confwatch_core::Engine;
use confwatch_server::{create_router, AppState};
use confwatch_test_utils::{assert_diff_contains, assert_file_equals, BuiltTestHost, TestHost};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    host: BuiltTestHost,
    engine: Arc<Engine>,
    router: Router,
}

async fn app() -> TestApp {
    let host = TestHost::new()
        .with_file("app.env", "A=1\n")
        .with_missing("gone.conf")
        .build();
    let engine = Arc::new(Engine::open(host.config()).await.unwrap());
    let router = create_router(AppState::from_shared(engine.clone()));
    TestApp {
        host,
        engine,
        router,
    }
}

fn encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(router, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn health_and_version() {
    let app = app().await;

    let (status, body) = get_json(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);

    let (status, body) = get_json(&app.router, "/api/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn files_lists_watch_targets() {
    let app = app().await;

    let (status, body) = get_json(&app.router, "/api/files").await;
    assert_eq!(status, StatusCode::OK);

    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["name"], app.host.name("app.env"));
    assert_eq!(files[0]["abs_path"], app.host.name("app.env"));
    assert_eq!(files[0]["exists"], true);
    assert_eq!(files[0]["history_count"], 0);
    assert_eq!(files[1]["exists"], false);
}

#[tokio::test]
async fn snapshot_history_and_diffs() {
    let app = app().await;
    let file = app.host.name("app.env");

    let (status, body) = post_json(
        &app.router,
        "/api/snapshot",
        json!({ "file": file, "comment": "initial" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], format!("Snapshot created for {}", file));

    let (_, body) = post_json(&app.router, "/api/snapshot", json!({ "file": file })).await;
    assert_eq!(body["message"], format!("No changes detected in {}", file));

    let (status, diff) = get(&app.router, &format!("/api/diff?file={}", encode(&file))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(diff, "");

    app.host.write_file("app.env", "A=2\n");
    let (_, diff) = get(&app.router, &format!("/api/diff?file={}", encode(&file))).await;
    assert_diff_contains(&diff, &["A=1"], &["A=2"]);

    post_json(&app.router, "/api/snapshot", json!({ "file": file })).await;

    let (status, body) =
        get_json(&app.router, &format!("/api/history?file={}", encode(&file))).await;
    assert_eq!(status, StatusCode::OK);
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);

    let first = history[0]["message"].as_str().unwrap();
    assert!(first.starts_with(&format!("Snapshot: {} at ", file)));
    assert!(first.ends_with("\ninitial"));
    assert_eq!(history[0]["action"], "capture");

    let from = history[0]["hash"].as_str().unwrap();
    let to = history[1]["hash"].as_str().unwrap();
    let (status, diff) = get(
        &app.router,
        &format!(
            "/api/diff_between?file={}&from={}&to={}",
            encode(&file),
            from,
            &to[..10]
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_diff_contains(&diff, &["A=1"], &["A=2"]);
}

#[tokio::test]
async fn rollback_restores_file() {
    let app = app().await;
    let file = app.host.name("app.env");

    let s1 = app
        .engine
        .snapshot(&file, None, false)
        .await
        .unwrap()
        .into_snapshot();
    app.host.write_file("app.env", "A=2\n");
    app.engine.snapshot(&file, None, false).await.unwrap();

    let (status, body) = post_json(
        &app.router,
        "/api/rollback",
        json!({ "file": file, "commit_hash": s1.hash.as_str() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        format!(
            "Successfully rolled back {} to snapshot {}",
            file,
            s1.hash.prefix(8)
        )
    );
    assert_file_equals(&app.host.file("app.env"), "A=1\n");

    let (_, body) = get_json(&app.router, &format!("/api/history?file={}", encode(&file))).await;
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2]["action"], "rollback");
    assert!(history[2]["message"]
        .as_str()
        .unwrap()
        .ends_with(&format!("\nrollback to {}", s1.hash.prefix(8))));
}

#[tokio::test]
async fn error_responses() {
    let app = app().await;
    let file = app.host.name("app.env");

    // Not a watch target
    let (status, body) = get_json(&app.router, "/api/history?file=%2Fetc%2Fpasswd").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "UNKNOWN_FILE");

    // Missing parameter
    let (status, body) = get_json(&app.router, "/api/history").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    // Watched, never snapshotted
    let (status, body) =
        get_json(&app.router, &format!("/api/history?file={}", encode(&file))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history"], json!([]));

    let (status, text) = get(&app.router, &format!("/api/diff?file={}", encode(&file))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(text.contains("No snapshots"));

    let (status, _) = get(
        &app.router,
        &format!("/api/diff_between?file={}&from=abcd", encode(&file)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(
        &app.router,
        "/api/rollback",
        json!({ "file": file, "commit_hash": "0000000000000000" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = post_json(&app.router, "/api/rollback", json!({ "file": file })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = post_json(
        &app.router,
        "/api/snapshot",
        json!({ "file": app.host.name("gone.conf") }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "IO_ERROR");
}
