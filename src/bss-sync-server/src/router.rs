use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use crate::download::handle_download;
use crate::manual_seed::handle_manual_seed;
use crate::state::AppState;
use crate::upload::{handle_upload, UploadEnvelopeError};
use crate::wire::{DownloadQuery, ErrorBody, ManualSeedRequest, UploadRequest};

impl IntoResponse for UploadEnvelopeError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (axum::http::StatusCode::BAD_REQUEST, body).into_response()
    }
}

async fn upload(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UploadRequest>,
) -> Result<impl IntoResponse, UploadEnvelopeError> {
    let response = handle_upload(&state, &request, Utc::now()).await?;
    Ok(Json(response))
}

async fn download(State(state): State<Arc<AppState>>, Query(query): Query<DownloadQuery>) -> impl IntoResponse {
    Json(handle_download(&state, &query, Utc::now()).await)
}

async fn seed(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ManualSeedRequest>,
) -> impl IntoResponse {
    match handle_manual_seed(&state, &request, Utc::now()).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => (
            axum::http::StatusCode::BAD_REQUEST,
            Json(ErrorBody { error: err.to_string() }),
        )
            .into_response(),
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// Builds the central server's HTTP surface (§6.1): `/api/sync/upload`
/// (C7), `/api/sync/changes` (C8), `/api/admin/seed` (C10, not
/// store-facing), plus the liveness probe every teacher binary exposes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/sync/upload", post(upload))
        .route("/api/sync/changes", get(download))
        .route("/api/admin/seed", post(seed))
        .with_state(state)
}
