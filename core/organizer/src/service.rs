//! HTTP adapter over [`CodeOrganizer`]. Handlers only translate JSON; the
//! engines do all the work and nothing is stored between requests.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use code_organizer_schemas::{
    BatchMergeRequest, ClassifyRequest, GroupRequest, MergeCandidatesRequest, MergeExecuteRequest, SequenceRequest,
    SimilarityRequest,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::OrganizerError;
use crate::organizer::CodeOrganizer;

#[derive(Clone)]
struct AppState {
    organizer: Arc<CodeOrganizer>,
}

pub fn router(organizer: Arc<CodeOrganizer>) -> Router {
    let state = AppState { organizer };

    // CORS layer for editor and browser extensions
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/classify", post(classify))
        .route("/organize", post(organize))
        .route("/similarity", post(similarity))
        .route("/sequence", post(sequence))

        // Merging
        .route("/merge/candidates", post(merge_candidates))
        .route("/merge/execute", post(merge_execute))
        .route("/merge/batch", post(merge_batch))

        // Grouping
        .route("/groups", post(groups))

        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "code-organizer",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn classify(State(state): State<AppState>, Json(request): Json<ClassifyRequest>) -> impl IntoResponse {
    info!(
        "Classify request: {} chars, {} corpus items",
        request.text.len(),
        request.corpus.len()
    );
    let outcome = state.organizer.process_and_classify(
        &request.text,
        request.timestamp.unwrap_or_else(Utc::now),
        &request.corpus,
        request.include_suggestions,
    );
    Json(outcome)
}

async fn organize(State(state): State<AppState>, Json(request): Json<ClassifyRequest>) -> impl IntoResponse {
    info!(
        "Organize request: {} chars, {} corpus items",
        request.text.len(),
        request.corpus.len()
    );
    let outcome = state.organizer.process_and_classify(
        &request.text,
        request.timestamp.unwrap_or_else(Utc::now),
        &request.corpus,
        true,
    );
    Json(outcome)
}

async fn similarity(State(state): State<AppState>, Json(request): Json<SimilarityRequest>) -> impl IntoResponse {
    let result = state.organizer.calculate_similarity(&request.a, &request.b);
    info!("Similarity: {:.3} ({})", result.score, result.category.as_str());
    Json(result)
}

async fn sequence(State(state): State<AppState>, Json(request): Json<SequenceRequest>) -> impl IntoResponse {
    info!(
        "Sequence request for {} against {} items",
        request.item.id,
        request.related.len()
    );
    Json(state.organizer.analyze_sequence(&request.item, &request.related))
}

async fn merge_candidates(
    State(state): State<AppState>,
    Json(request): Json<MergeCandidatesRequest>,
) -> impl IntoResponse {
    let candidates = state
        .organizer
        .find_merge_candidates(&request.source, &request.targets);
    info!(
        "Merge candidates for {}: {} of {} targets",
        request.source.id,
        candidates.len(),
        request.targets.len()
    );
    Json(candidates)
}

async fn merge_execute(
    State(state): State<AppState>,
    Json(request): Json<MergeExecuteRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    info!(
        "Merge request: {} into {} ({})",
        request.source.id,
        request.target.id,
        request.candidate.strategy.as_str()
    );

    let result = state
        .organizer
        .execute_merge(&request.source, &request.target, &request.candidate, &request.options)
        .map_err(|e| {
            error!("Failed to execute merge: {}", e);
            (status_for(&e), e.to_string())
        })?;

    if !result.success {
        warn!("Merge refused: {}", result.warnings.join("; "));
    }
    Ok(Json(result))
}

async fn merge_batch(State(state): State<AppState>, Json(request): Json<BatchMergeRequest>) -> impl IntoResponse {
    info!("Batch merge request: {} items", request.items.len());
    Json(state.organizer.batch_merge(&request.items))
}

async fn groups(State(state): State<AppState>, Json(request): Json<GroupRequest>) -> impl IntoResponse {
    info!("Grouping request: {} corpus items", request.corpus.len());
    Json(state.organizer.group_content(&request.corpus))
}

fn status_for(error: &OrganizerError) -> StatusCode {
    match error {
        OrganizerError::CandidateMismatch { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
