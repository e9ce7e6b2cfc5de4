//! API server entry point.

use api::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use storage::{InMemoryStore, PostgresStore};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve(listener: TcpListener, app: axum::Router) {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn run_postgres(
    config: &Config,
    url: &str,
    metrics: PrometheusHandle,
    listener: TcpListener,
) {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(url)
        .await
        .expect("failed to connect to database");
    let store = PostgresStore::new(pool);
    store
        .run_migrations()
        .await
        .expect("failed to run migrations");

    tracing::info!("serving from PostgreSQL");
    let state = api::create_state(store, config);
    serve(listener, api::create_app(state, metrics)).await;
}

async fn run_in_memory(config: &Config, metrics: PrometheusHandle, listener: TcpListener) {
    tracing::warn!("DATABASE_URL not set, serving from the in-memory store");
    let state = api::create_state(InMemoryStore::new(), config);
    serve(listener, api::create_app(state, metrics)).await;
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Bind and serve from the configured store
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    tracing::info!(%addr, "starting API server");

    match config.database_url.clone() {
        Some(url) => run_postgres(&config, &url, metrics_handle, listener).await,
        None => run_in_memory(&config, metrics_handle, listener).await,
    }

    tracing::info!("server shut down gracefully");
}
