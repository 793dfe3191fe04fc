//! Prediction HTTP API.
//!
//! - POST /predict
//! - GET /

use std::sync::Arc;

use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info_span};
use uuid::Uuid;

use crate::service::{InferenceService, Prediction, PredictError};

/// Body of `GET /`.
pub const WELCOME_MESSAGE: &str = "Welcome to the Diabetes Prediction API";

/// Application state shared across handlers.
pub struct AppState {
    pub service: InferenceService,
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(home))
        .route("/predict", post(predict))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// Failure body for `/predict`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn home() -> &'static str {
    WELCOME_MESSAGE
}

/// The body is taken raw, and its rejection kept, so that oversized or
/// undecodable bodies go through the same error contract as inference
/// failures.
async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Prediction>, PredictError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("predict", %request_id);

    span.in_scope(|| {
        let result = body
            .map_err(|rejection| PredictError::UnreadableBody(rejection.body_text()))
            .and_then(|body| state.service.predict_json(&body));

        match result {
            Ok(prediction) => Ok(Json(prediction)),
            Err(e) => {
                error!(error = ?e, "Prediction failed");
                Err(e)
            }
        }
    })
}
