//! Favourite book endpoints.

use std::sync::Arc;

use axum::Extension;
use axum::extract::{Path, State};
use storage::{BookId, Store, UserId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::views::BookView;

/// GET /user/{id}/favourite
#[tracing::instrument(skip(state, auth))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<i64>,
) -> Result<ApiResponse<Vec<BookView>>, ApiError> {
    let user_id = UserId::new(user_id);
    auth.ensure_owner(user_id)?;
    let books = state.favourites.list_favourites(user_id).await?;
    Ok(ApiResponse::ok(
        "favourites retrieved successfully",
        books.into_iter().map(BookView::from).collect(),
    ))
}

/// POST /user/{id}/favourite/{book_id}
#[tracing::instrument(skip(state, auth))]
pub async fn add<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(auth): Extension<AuthUser>,
    Path((user_id, book_id)): Path<(i64, i64)>,
) -> Result<ApiResponse<()>, ApiError> {
    let user_id = UserId::new(user_id);
    auth.ensure_owner(user_id)?;
    state
        .favourites
        .add_favourite(user_id, BookId::new(book_id))
        .await?;
    Ok(ApiResponse::message("added to favourites"))
}

/// DELETE /user/{id}/favourite/{book_id}
#[tracing::instrument(skip(state, auth))]
pub async fn remove<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(auth): Extension<AuthUser>,
    Path((user_id, book_id)): Path<(i64, i64)>,
) -> Result<ApiResponse<()>, ApiError> {
    let user_id = UserId::new(user_id);
    auth.ensure_owner(user_id)?;
    state
        .favourites
        .remove_favourite(user_id, BookId::new(book_id))
        .await?;
    Ok(ApiResponse::message("removed from favourites"))
}
