mod common;

use common::{file_form, spawn_analytics};
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn analyze(base: &str, name: &str, body: &[u8]) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base}/analyze"))
        .multipart(file_form(name, "text/csv", body))
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn analyze_returns_statistics() {
    let base = spawn_analytics().await;

    let (status, body) = analyze(&base, "data.csv", b"x,label\n1,a\n2,b\n3,c\n4,\n").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"], 4);
    assert_eq!(body["columns"], json!(["x", "label"]));
    assert_eq!(body["data_types"], json!({ "label": "text", "x": "integer" }));
    assert_eq!(body["missing_values"], json!({ "label": 1, "x": 0 }));
    assert_eq!(body["summary"]["x"]["count"], 4);
    assert_eq!(body["summary"]["x"]["25%"], 1.75);
    assert_eq!(body["summary"]["x"]["50%"], 2.5);
    assert!(body["summary"].get("label").is_none());
    assert_eq!(body["sample"][3]["label"], Value::Null);
}

#[tokio::test]
async fn empty_input_is_a_bad_request() {
    let base = spawn_analytics().await;

    let (status, body) = analyze(&base, "empty.csv", b"").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "analysis failed: no columns to parse from input", "status": 400 })
    );
}

#[tokio::test]
async fn ragged_rows_are_a_bad_request() {
    let base = spawn_analytics().await;

    let (status, body) = analyze(&base, "bad.csv", b"a,b\n1,2,3\n").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("analysis failed: malformed input"));
}

#[tokio::test]
async fn health_reports_liveness() {
    let base = spawn_analytics().await;

    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body, json!({ "status": "healthy", "service": "analytics" }));
}
