//! Cart reservation endpoints.

use std::sync::Arc;

use axum::Extension;
use axum::extract::{Path, State};
use serde::Deserialize;
use domain::MAX_QUANTITY;
use storage::{BookId, Store, UserId};

use crate::auth::AuthUser;
use crate::error::{ApiError, FieldErrors};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{Rules, Validate, ValidatedJson};
use crate::views::{CartEntryView, CartView};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub book_id: i64,
    pub quantity: i32,
}

impl Validate for AddToCartRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        Rules::new()
            .min("bookId", self.book_id, 1)
            .range("quantity", self.quantity, 1, MAX_QUANTITY)
            .finish()
    }
}

/// GET /user/{id}/cart
#[tracing::instrument(skip(state, auth))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<i64>,
) -> Result<ApiResponse<CartView>, ApiError> {
    let user_id = UserId::new(user_id);
    auth.ensure_owner(user_id)?;
    let cart = state.cart.list_cart(user_id).await?;
    Ok(ApiResponse::ok("cart retrieved successfully", cart.into()))
}

/// POST /user/{id}/cart
#[tracing::instrument(skip(state, auth))]
pub async fn add<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<AddToCartRequest>,
) -> Result<ApiResponse<CartEntryView>, ApiError> {
    let user_id = UserId::new(user_id);
    auth.ensure_owner(user_id)?;
    let entry = state
        .cart
        .add_to_cart(user_id, BookId::new(req.book_id), req.quantity)
        .await?;
    Ok(ApiResponse::created("added to cart", entry.into()))
}

/// DELETE /user/{id}/cart/{book_id}
#[tracing::instrument(skip(state, auth))]
pub async fn remove<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(auth): Extension<AuthUser>,
    Path((user_id, book_id)): Path<(i64, i64)>,
) -> Result<ApiResponse<CartEntryView>, ApiError> {
    let user_id = UserId::new(user_id);
    auth.ensure_owner(user_id)?;
    let entry = state
        .cart
        .remove_from_cart(user_id, BookId::new(book_id))
        .await?;
    Ok(ApiResponse::ok("removed from cart", entry.into()))
}
