//! Category endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use serde::Deserialize;
use storage::{CategoryId, Store};

use crate::error::{ApiError, FieldErrors};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{Rules, Validate, ValidatedJson};
use crate::views::CategoryView;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CategoryRequest {
    pub name: String,
}

impl Validate for CategoryRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        Rules::new()
            .required("name", &self.name)
            .not_blank("name", &self.name)
            .length("name", self.name.trim(), 3, 32)
            .finish()
    }
}

/// POST /category
#[tracing::instrument(skip(state))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ValidatedJson(req): ValidatedJson<CategoryRequest>,
) -> Result<ApiResponse<CategoryView>, ApiError> {
    let category = state.categories.create_category(&req.name).await?;
    Ok(ApiResponse::created(
        "category created successfully",
        category.into(),
    ))
}

/// GET /category
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<ApiResponse<Vec<CategoryView>>, ApiError> {
    let categories = state.categories.list_categories().await?;
    Ok(ApiResponse::ok(
        "categories retrieved successfully",
        categories.into_iter().map(CategoryView::from).collect(),
    ))
}

/// GET /category/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<CategoryView>, ApiError> {
    let category = state.categories.get_category(CategoryId::new(id)).await?;
    Ok(ApiResponse::ok("category found", category.into()))
}

/// PUT /category/{id}
#[tracing::instrument(skip(state))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<CategoryRequest>,
) -> Result<ApiResponse<CategoryView>, ApiError> {
    let category = state
        .categories
        .update_category(CategoryId::new(id), &req.name)
        .await?;
    Ok(ApiResponse::ok(
        "category updated successfully",
        category.into(),
    ))
}

/// DELETE /category/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    state.categories.delete_category(CategoryId::new(id)).await?;
    Ok(ApiResponse::message("category deleted successfully"))
}
