//! HTTP API server with observability for the bookstore backend.
//!
//! Provides REST endpoints for users, the catalog, favourites, cart
//! reservations and orders, with structured logging (tracing) and Prometheus
//! metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;
pub mod validation;
pub mod views;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use chrono::Duration;
use domain::TokenIssuer;
use metrics_exporter_prometheus::PrometheusHandle;
use storage::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
///
/// Read-only catalog routes, registration and login are public; everything
/// else goes through [`auth::require_auth`].
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let public = Router::new()
        .route("/health", get(routes::health::check))
        .route("/users/register", post(routes::users::register::<S>))
        .route("/users/login", post(routes::users::login::<S>))
        .route("/category", get(routes::categories::list::<S>))
        .route("/category/{id}", get(routes::categories::get::<S>))
        .route("/cover/{id}", get(routes::covers::get::<S>))
        .route("/book", get(routes::books::list::<S>))
        .route("/book/{id}", get(routes::books::get::<S>));

    let protected = Router::new()
        .route("/user", get(routes::users::list::<S>))
        .route(
            "/user/{id}",
            get(routes::users::get::<S>)
                .put(routes::users::update::<S>)
                .delete(routes::users::delete::<S>),
        )
        .route("/category", post(routes::categories::create::<S>))
        .route(
            "/category/{id}",
            put(routes::categories::update::<S>).delete(routes::categories::delete::<S>),
        )
        .route("/cover/{id}", put(routes::covers::update::<S>))
        .route("/book", post(routes::books::create::<S>))
        .route(
            "/book/{id}",
            put(routes::books::update::<S>).delete(routes::books::delete::<S>),
        )
        .route("/user/{id}/favourite", get(routes::favourites::list::<S>))
        .route(
            "/user/{id}/favourite/{book_id}",
            post(routes::favourites::add::<S>).delete(routes::favourites::remove::<S>),
        )
        .route(
            "/user/{id}/cart",
            get(routes::cart::list::<S>).post(routes::cart::add::<S>),
        )
        .route("/user/{id}/cart/{book_id}", delete(routes::cart::remove::<S>))
        .route(
            "/user/{id}/order",
            get(routes::orders::list_for_user::<S>).post(routes::orders::place::<S>),
        )
        .route("/order", get(routes::orders::list::<S>))
        .route("/order/{id}", get(routes::orders::get::<S>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth::<S>,
        ));

    public
        .merge(protected)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over `store` with token settings from
/// `config`.
pub fn create_state<S: Store + Clone + 'static>(store: S, config: &Config) -> Arc<AppState<S>> {
    let tokens = TokenIssuer::new(
        config.jwt_secret.as_bytes(),
        Duration::hours(config.jwt_ttl_hours),
    );
    Arc::new(AppState::new(store, tokens))
}
