use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    Json,
};
use easel_core::GenerationRequest;

use crate::{
    error::ApiError,
    form::EditForm,
    response::{HealthResponse, ImagesResponse},
    AppState,
};

/// POST /v1/images/edits
pub(crate) async fn edit_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImagesResponse>, ApiError> {
    let input = EditForm::read(multipart?).await?.into_input()?;
    let image = state.edit.edit(input).await?;
    Ok(Json(ImagesResponse::from_image(&image)?))
}

/// POST /v1/images/generations
pub(crate) async fn generate_image(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<ImagesResponse>, ApiError> {
    let Json(request) = payload?;
    let image = state.generation.generate(request).await?;
    Ok(Json(ImagesResponse::from_image(&image)?))
}

/// GET /health
pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        generation: state.generation.is_loaded(),
        edit: state.edit.is_loaded(),
    })
}
