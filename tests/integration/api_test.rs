//! HTTP API tests over the in-memory store.

#![cfg(unix)]

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use partview_core::types::FileId;

use helpers::{FakeTools, Harness, request, upload};

async fn completed_upload(harness: &Harness) -> (axum::Router, String) {
    let router = harness.router();
    let response = upload(&router, "part.stl", b"solid part").await;
    assert_eq!(response.status, StatusCode::OK);
    let id = response.body["data"]["id"].as_str().expect("id").to_string();
    let file_id: FileId = id.parse().expect("uuid");
    harness.wait_terminal(file_id).await;
    (router, id)
}

#[tokio::test]
async fn test_health_reports_metrics() {
    let harness = Harness::new(FakeTools::default());
    let response = request(&harness.router(), "GET", "/api/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["in_flight"], 0);
    assert_eq!(response.body["data"]["conversions"]["started"], 0);
}

#[tokio::test]
async fn test_upload_returns_uploading_record() {
    let harness = Harness::new(FakeTools::default());
    let response = upload(&harness.router(), "Widget.STL", b"solid widget").await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["originalFilename"], "Widget.STL");
    assert_eq!(data["status"], "uploading");
    assert_eq!(data["fileSize"], 12);
    assert!(data["glbUrl"].is_null());
}

#[tokio::test]
async fn test_upload_rejects_unsupported_format() {
    let harness = Harness::new(FakeTools::default());
    let router = harness.router();

    let response = upload(&router, "readme.txt", b"hello").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");

    let list = request(&router, "GET", "/api/cad/files", None).await;
    assert_eq!(list.body["data"], json!([]));
}

#[tokio::test]
async fn test_completed_file_details_parts_and_container() {
    let harness = Harness::new(FakeTools::default());
    let (router, id) = completed_upload(&harness).await;

    let details = request(&router, "GET", &format!("/api/cad/files/{id}"), None).await;
    assert_eq!(details.status, StatusCode::OK);
    let data = &details.body["data"];
    assert_eq!(data["status"], "completed");
    assert_eq!(data["glbUrl"], format!("/api/cad/files/{id}/glb"));
    assert_eq!(data["parts"][0]["partKey"], "fallback:Body:1");
    assert_eq!(data["parts"][0]["displayName"], "Body");
    assert!(data["parts"][0]["note"].is_null());

    let parts = request(&router, "GET", &format!("/api/cad/files/{id}/parts"), None).await;
    assert_eq!(parts.body["data"].as_array().map(Vec::len), Some(1));

    let glb = request(&router, "GET", &format!("/api/cad/files/{id}/glb"), None).await;
    assert_eq!(glb.status, StatusCode::OK);
    assert_eq!(glb.headers["content-type"], "model/gltf-binary");
    assert_eq!(glb.headers["cache-control"], "no-cache");
    assert_eq!(glb.bytes, b"glTF");
}

#[tokio::test]
async fn test_failed_file_has_no_container() {
    let harness = Harness::new(FakeTools {
        mesh: "exit 1\n".to_string(),
        ..FakeTools::default()
    });
    let (router, id) = completed_upload(&harness).await;

    let details = request(&router, "GET", &format!("/api/cad/files/{id}"), None).await;
    assert_eq!(details.body["data"]["status"], "failed");

    let glb = request(&router, "GET", &format!("/api/cad/files/{id}/glb"), None).await;
    assert_eq!(glb.status, StatusCode::NOT_FOUND);
    assert_eq!(glb.body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_rename_and_notes() {
    let harness = Harness::new(FakeTools::default());
    let (router, file_id) = completed_upload(&harness).await;
    let parts = request(&router, "GET", &format!("/api/cad/files/{file_id}/parts"), None).await;
    let part_id = parts.body["data"][0]["id"].as_str().expect("part id").to_string();

    let renamed = request(
        &router,
        "PATCH",
        &format!("/api/parts/{part_id}/display-name"),
        Some(json!({ "displayName": "Main body" })),
    )
    .await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.body["data"]["displayName"], "Main body");
    assert_eq!(renamed.body["data"]["name"], "Body");

    let missing = request(
        &router,
        "PATCH",
        &format!("/api/parts/{part_id}/display-name"),
        Some(json!({})),
    )
    .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let by_key = request(
        &router,
        "PATCH",
        &format!("/api/cad/files/{file_id}/parts/fallback:Body:1/display-name"),
        Some(json!({ "displayName": "" })),
    )
    .await;
    assert_eq!(by_key.status, StatusCode::OK);
    assert_eq!(by_key.body["data"]["displayName"], "Body");

    let noted = request(
        &router,
        "POST",
        &format!("/api/parts/{part_id}/note"),
        Some(json!({ "note": "Check wall thickness" })),
    )
    .await;
    assert_eq!(noted.status, StatusCode::OK);
    assert_eq!(noted.body["data"]["note"], "Check wall thickness");

    let deleted = request(&router, "DELETE", &format!("/api/parts/{part_id}/note"), None).await;
    assert_eq!(deleted.status, StatusCode::OK);

    let part = request(&router, "GET", &format!("/api/parts/{part_id}"), None).await;
    assert!(part.body["data"]["note"].is_null());
}

#[tokio::test]
async fn test_bad_and_unknown_ids() {
    let harness = Harness::new(FakeTools::default());
    let router = harness.router();

    let bad = request(&router, "GET", "/api/cad/files/not-a-uuid", None).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    let unknown = request(&router, "GET", &format!("/api/cad/files/{}", FileId::new()), None).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let part = request(&router, "GET", &format!("/api/parts/{}", FileId::new()), None).await;
    assert_eq!(part.status, StatusCode::NOT_FOUND);
}
