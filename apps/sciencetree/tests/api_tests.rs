//! Integration tests for the Science Tree HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use axum_test::TestServer;
use base64::{Engine, engine::general_purpose::STANDARD};
use sciencetree::api::{AppState, ErrorResponse, HealthResponse, create_router};
use sciencetree::config::AppConfig;
use sciencetree_core::{Group, TreeResult};
use serde_json::json;

/// A cites B, B cites C.
const WOS_CHAIN: &str = "FN Clarivate Analytics Web of Science
VR 1.0
PT J
AU Adams, A
TI Applications of the method
SO JOURNAL OF TESTS
PY 2015
VL 30
BP 300
CR Baker B, 2005, J TEST, V20, P200
UT WOS:A
ER

PT J
AU Baker, B
TI Refining the method
SO JOURNAL OF TESTS
PY 2005
VL 20
BP 200
CR Clark C, 1995, J TEST, V10, P100
UT WOS:B
ER

PT J
AU Clark, C
TI The method
SO JOURNAL OF TESTS
PY 1995
VL 10
BP 100
UT WOS:C
ER

EF
";

/// Two records that cite nothing inside the file.
const WOS_UNLINKED: &str = "PT J
TI First
UT WOS:1
ER

PT J
TI Second
UT WOS:2
ER
";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn test_config() -> AppConfig {
    AppConfig {
        rate_limit: 0,
        ..AppConfig::default()
    }
}

fn create_test_server(config: AppConfig) -> TestServer {
    TestServer::new(create_router(AppState::new(config))).unwrap()
}

fn upload(seed: &str, filename: &str, text: &str) -> serde_json::Value {
    json!({
        "seed": seed,
        "filename": filename,
        "content": STANDARD.encode(text),
    })
}

async fn generate_chain(server: &TestServer) -> TreeResult {
    let response = server
        .post("/trees")
        .json(&upload("method", "savedrecs.txt", WOS_CHAIN))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

// =============================================================================
// HEALTH
// =============================================================================

#[tokio::test]
async fn health_reports_versions() {
    let server = create_test_server(test_config());

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert!(health.algorithm_version.starts_with("sap-dag/"));
}

// =============================================================================
// GENERATE
// =============================================================================

#[tokio::test]
async fn generate_classifies_chain() {
    let server = create_test_server(test_config());

    let result = generate_chain(&server).await;

    assert_eq!(result.metadata.seed, "method");
    assert_eq!(result.nodes.len(), 3);
    assert_eq!(result.links.len(), 2);
    assert_eq!(result.statistics.roots, 1);
    assert_eq!(result.statistics.trunks, 1);
    assert_eq!(result.statistics.leaves, 1);

    let group_of = |label: &str| {
        result
            .nodes
            .iter()
            .find(|n| n.label == label)
            .map(|n| n.group)
            .unwrap()
    };
    assert_eq!(group_of("Applications of the method"), Group::Root);
    assert_eq!(group_of("Refining the method"), Group::Trunk);
    assert_eq!(group_of("The method"), Group::Leaf);
}

#[tokio::test]
async fn generate_with_named_format_and_locale() {
    let server = create_test_server(test_config());

    let response = server
        .post("/trees")
        .json(&json!({
            "seed": "método",
            "format": "web_of_science",
            "content": STANDARD.encode(WOS_CHAIN),
            "locale": "es",
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let result: TreeResult = response.json();
    assert!(result.nodes.iter().any(|n| n.type_label == "Raíz"));
}

#[tokio::test]
async fn unsupported_extension_is_415() {
    let server = create_test_server(test_config());

    let response = server
        .post("/trees")
        .json(&upload("s", "paper.pdf", WOS_CHAIN))
        .await;

    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let error: ErrorResponse = response.json();
    assert_eq!(error.error, "unsupported_format");
}

#[tokio::test]
async fn malformed_file_is_422() {
    let server = create_test_server(test_config());

    let response = server
        .post("/trees")
        .json(&upload("s", "savedrecs.txt", "PT J\nTI Never closed\n"))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = response.json();
    assert_eq!(error.error, "malformed_input");
}

#[tokio::test]
async fn empty_tree_is_422() {
    let server = create_test_server(test_config());

    let response = server
        .post("/trees")
        .json(&upload("s", "savedrecs.txt", WOS_UNLINKED))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = response.json();
    assert_eq!(error.error, "empty_tree");
}

#[tokio::test]
async fn invalid_base64_is_400() {
    let server = create_test_server(test_config());

    let response = server
        .post("/trees")
        .json(&json!({"seed": "s", "filename": "a.txt", "content": "!!not base64!!"}))
        .await;

    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert_eq!(error.error, "bad_request");
}

#[tokio::test]
async fn missing_format_is_400() {
    let server = create_test_server(test_config());

    let response = server
        .post("/trees")
        .json(&json!({"seed": "s", "content": STANDARD.encode(WOS_CHAIN)}))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let server = create_test_server(AppConfig {
        max_upload_bytes: 64,
        ..test_config()
    });

    let response = server
        .post("/trees")
        .json(&upload("s", "savedrecs.txt", WOS_CHAIN))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

// =============================================================================
// EXPORT
// =============================================================================

#[tokio::test]
async fn export_json_round_trips() {
    let server = create_test_server(test_config());
    let result = generate_chain(&server).await;

    let response = server.post("/export/json").json(&result).await;

    response.assert_status_ok();
    let disposition = response.header("content-disposition");
    assert_eq!(
        disposition.to_str().unwrap(),
        "attachment; filename=\"method.json\""
    );
    let back: TreeResult = serde_json::from_str(&response.text()).unwrap();
    assert_eq!(back, result);
}

#[tokio::test]
async fn export_csv_lists_nodes() {
    let server = create_test_server(test_config());
    let result = generate_chain(&server).await;

    let response = server.post("/export/csv").json(&result).await;

    response.assert_status_ok();
    assert!(
        response
            .header("content-type")
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let csv = response.text();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("title,year,type,relevance,times_cited"));
    assert_eq!(lines.count(), 3);
}

// =============================================================================
// RATE LIMITING
// =============================================================================

#[tokio::test]
async fn rate_limit_rejects_burst() {
    let server = create_test_server(AppConfig {
        rate_limit: 1,
        ..AppConfig::default()
    });

    server.get("/health").await.assert_status_ok();
    let response = server.get("/health").await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let error: ErrorResponse = response.json();
    assert_eq!(error.error, "rate_limited");
}
