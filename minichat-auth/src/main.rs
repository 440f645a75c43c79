use axum::{routing::{get, post}, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod models;
mod routes;
mod schema;
mod services;

use config::AppConfig;
use minichat_shared::clients::db::{create_pool, DbPool};
use minichat_shared::middleware::{init_metrics, metrics_middleware, request_log_middleware, SharedLogSink};
use minichat_shared::request_log::PgRequestLogs;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub http_client: reqwest::Client,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    minichat_shared::middleware::init_tracing("minichat-auth");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let metrics = init_metrics()?;
    let request_logs: SharedLogSink = Arc::new(PgRequestLogs::new(db.clone()));

    let state = Arc::new(AppState {
        db,
        config,
        http_client: reqwest::Client::new(),
        metrics,
    });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/register", post(routes::register::register))
        .route("/login", post(routes::login::login))
        .route("/google-login", post(routes::oauth::google_login))
        .route("/refresh-token", post(routes::refresh::refresh_token))
        .route("/logout", post(routes::logout::logout))
        .route("/me", get(routes::me::me))
        .layer(axum::middleware::from_fn_with_state(request_logs, request_log_middleware))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "minichat-auth starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
