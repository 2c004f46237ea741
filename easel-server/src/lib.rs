use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use easel_core::{EditService, GenerationService};
use tower_http::trace::TraceLayer;

pub mod config;
mod error;
mod form;
mod handlers;
pub mod response;

pub use error::{ApiError, ErrorBody, ErrorDetail};

/// Services shared by every handler, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub edit: Arc<EditService>,
    pub generation: Arc<GenerationService>,
}

impl AppState {
    pub fn new(edit: EditService, generation: GenerationService) -> Self {
        Self {
            edit: Arc::new(edit),
            generation: Arc::new(generation),
        }
    }

    /// Drops both pipelines.
    pub fn release(&self) {
        self.generation.release();
        self.edit.release();
    }
}

pub fn router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/v1/images/edits", post(handlers::edit_image))
        .route("/v1/images/generations", post(handlers::generate_image))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
