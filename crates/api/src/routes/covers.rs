//! Cover image endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use domain::CoverImage;
use serde::Deserialize;
use storage::{CoverId, Store};

use crate::error::{ApiError, FieldErrors};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{Rules, Validate, ValidatedJson};
use crate::views::CoverView;

/// A cover upload: declared MIME type and base64 image bytes.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CoverRequest {
    pub encoding: String,
    pub content: String,
}

impl CoverRequest {
    /// Decodes the content and checks it against the declared encoding.
    pub fn into_image(self) -> Result<CoverImage, ApiError> {
        Ok(CoverImage::from_base64(&self.encoding, &self.content)?)
    }
}

impl Validate for CoverRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        Rules::new()
            .required("encoding", &self.encoding)
            .image_encoding("encoding", &self.encoding)
            .required("content", &self.content)
            .not_blank("content", &self.content)
            .base64("content", &self.content)
            .finish()
    }
}

/// GET /cover/{id}: raw image bytes with their content type.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let cover = state.covers.get_cover(CoverId::new(id)).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, cover.encoding)],
        cover.content,
    ))
}

/// PUT /cover/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<CoverRequest>,
) -> Result<ApiResponse<CoverView>, ApiError> {
    let image = req.into_image()?;
    let cover = state.covers.update_cover(CoverId::new(id), image).await?;
    Ok(ApiResponse::ok("cover updated successfully", cover.into()))
}
