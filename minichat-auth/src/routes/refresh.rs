use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use minichat_shared::clients::db::checkout;
use minichat_shared::errors::AppResult;
use minichat_shared::types::auth::TokenPair;
use minichat_shared::types::ApiResponse;

use crate::services::token_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let mut conn = checkout(&state.db)?;

    let (user, token_pair) = token_service::rotate_session(&mut conn, &req.refresh_token, &state.config)?;

    tracing::info!(user_id = %user.id, "refresh token rotated");

    Ok(Json(ApiResponse::ok(token_pair)))
}
