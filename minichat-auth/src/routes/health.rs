use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;

use minichat_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

/// Health check that pings the database.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let db_state = state.clone();
    let database = tokio::task::spawn_blocking(move || {
        let mut conn = db_state.db.get()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok::<_, anyhow::Error>(())
    })
    .await;

    let check = match database {
        Ok(Ok(())) => HealthCheck::healthy("database"),
        Ok(Err(e)) => HealthCheck::unhealthy("database", e.to_string()),
        Err(e) => HealthCheck::unhealthy("database", e.to_string()),
    };

    let response = HealthResponse::healthy("minichat-auth", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![check]);

    let status = match response.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (status, Json(response)).into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}
