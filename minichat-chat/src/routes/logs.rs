use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;

use minichat_shared::errors::{AppError, AppResult, ErrorCode};
use minichat_shared::request_log::RequestLog;
use minichat_shared::types::api::ApiResponse;
use minichat_shared::types::auth::AuthUser;

use crate::routes::blocking;
use crate::AppState;

const DEFAULT_WINDOW_MINUTES: i64 = 5;

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Resolves the query window: `end` defaults to now, `start` to five minutes before `end`.
fn window(query: &LogQuery, now: DateTime<Utc>) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let end = query.end_time.unwrap_or(now);
    let start = query
        .start_time
        .unwrap_or(end - Duration::minutes(DEFAULT_WINDOW_MINUTES));
    if start > end {
        return Err(AppError::new(ErrorCode::ValidationError, "start_time must not be after end_time"));
    }
    Ok((start, end))
}

/// GET /log?start_time&end_time - request audit trail
pub async fn list_logs(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> AppResult<Json<ApiResponse<Vec<RequestLog>>>> {
    let (start, end) = window(&query, Utc::now())?;

    let logs = state.request_logs.clone();
    let found = blocking(move || logs.between(start, end)).await?;
    if found.is_empty() {
        return Err(AppError::new(ErrorCode::LogsNotFound, "no logs found"));
    }

    tracing::debug!(user_id = %auth_user.id, %start, %end, count = found.len(), "logs queried");
    Ok(Json(ApiResponse::ok(found)))
}
