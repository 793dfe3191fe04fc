//! HTTP server exposing the prediction API.
//!
//! - [`api`]: Request/response types and route handlers

pub mod api;

use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::config::Config;
use crate::model::loader::{load_model, LoadError};
use crate::service::InferenceService;
use api::{build_router, AppState};

/// Load the model and assemble the router.
///
/// Fails before anything is bound if the model cannot be loaded, so a
/// server built from this never runs without a model.
pub fn build_app(config: &Config) -> Result<Router, LoadError> {
    let model = load_model(&config.model.path)?;
    let service = InferenceService::new(model, config.model.positive_class)?;
    info!(
        kind = service.model().kind(),
        features = service.model().feature_names().len(),
        positive_class = config.model.positive_class,
        "Inference service ready"
    );
    Ok(build_router(Arc::new(AppState { service })))
}
