//! Order placement and order history endpoints.

use std::sync::Arc;

use axum::Extension;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use storage::{OrderId, Store, UserId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::views::OrderView;

/// POST /user/{id}/order: turns the whole cart into an order.
///
/// An empty cart answers 200 without data; a placed order answers 201.
#[tracing::instrument(skip(state, auth))]
pub async fn place<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<i64>,
) -> Result<Response, ApiError> {
    let user_id = UserId::new(user_id);
    auth.ensure_owner(user_id)?;
    let response = match state.orders.place_order(user_id).await? {
        Some(order) => {
            ApiResponse::created("order placed successfully", OrderView::from(order))
                .into_response()
        }
        None => ApiResponse::message("cart is empty, no order placed").into_response(),
    };
    Ok(response)
}

/// GET /user/{id}/order
#[tracing::instrument(skip(state, auth))]
pub async fn list_for_user<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<i64>,
) -> Result<ApiResponse<Vec<OrderView>>, ApiError> {
    let user_id = UserId::new(user_id);
    auth.ensure_owner(user_id)?;
    let orders = state.orders.list_orders_for_user(user_id).await?;
    Ok(ApiResponse::ok(
        "orders retrieved successfully",
        orders.into_iter().map(OrderView::from).collect(),
    ))
}

/// GET /order
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<ApiResponse<Vec<OrderView>>, ApiError> {
    let orders = state.orders.list_orders().await?;
    Ok(ApiResponse::ok(
        "orders retrieved successfully",
        orders.into_iter().map(OrderView::from).collect(),
    ))
}

/// GET /order/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<OrderView>, ApiError> {
    let order = state.orders.get_order(OrderId::new(id)).await?;
    Ok(ApiResponse::ok("order found", order.into()))
}
