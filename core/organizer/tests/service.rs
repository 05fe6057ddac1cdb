use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use code_organizer::{router, CodeOrganizer, OrganizerConfig};
use code_organizer_schemas::{
    ContentItem, CorpusSnapshot, GroupRequest, MergeCandidate, MergeExecuteRequest, MergeOptions, MergeStrategy,
    MergeType, SimilarityRequest,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> axum::Router {
    router(Arc::new(CodeOrganizer::new(OrganizerConfig::default()).unwrap()))
}

async fn post(uri: &str, body: String) -> (StatusCode, Vec<u8>) {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_health() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_similarity_of_identical_text() {
    let request = SimilarityRequest {
        a: "let x = 1;".to_string(),
        b: "let x = 1;".to_string(),
    };
    let (status, bytes) = post("/similarity", serde_json::to_string(&request).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["score"], 1.0);
    assert_eq!(body["category"], "exact_match");
}

#[tokio::test]
async fn test_classify_with_minimal_body() {
    let (status, bytes) = post("/classify", r#"{"text": "def add(a, b):\n    return a + b"}"#.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["classification"]["language"]["language"], "python");
    assert!(body["suggestions"].is_null());
}

#[tokio::test]
async fn test_organize_always_suggests() {
    let (status, bytes) = post("/organize", r#"{"text": "const a = 1;"}"#.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["suggestions"].is_object());
}

#[tokio::test]
async fn test_merge_execute_rejects_mismatched_ids() {
    let now = Utc::now();
    let source = ContentItem::snippet("a", "const a = 1;", now);
    let target = ContentItem::snippet("b", "const b = 2;", now);
    let request = MergeExecuteRequest {
        candidate: MergeCandidate {
            source_id: "someone-else".into(),
            target_id: target.id.clone(),
            merge_type: MergeType::Consolidate,
            strategy: MergeStrategy::SemanticConsolidation,
            confidence: 0.5,
            reason: String::new(),
            conflicts: vec![],
            preview: String::new(),
        },
        source,
        target,
        options: MergeOptions::default(),
    };
    let (status, _) = post("/merge/execute", serde_json::to_string(&request).unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_groups_report_every_strategy() {
    let request = GroupRequest {
        corpus: CorpusSnapshot::default(),
    };
    let (status, bytes) = post("/groups", serde_json::to_string(&request).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["strategy_reports"].as_array().unwrap().len(), 5);
    assert!(body["groups"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_client_error() {
    let (status, _) = post("/similarity", "{\"a\": 1}".to_string()).await;
    assert!(status.is_client_error());
}
