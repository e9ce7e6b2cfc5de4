//! Prometheus scrape endpoint.
//!
//! Exposes the counters recorded by the services (`cart_reservations_total`,
//! `cart_releases_total`, `orders_placed_total`, `users_registered_total`)
//! and the `order_total_cents` histogram.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_TEXT)], handle.render())
}
