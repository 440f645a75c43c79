use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use minichat_shared::clients::db::checkout;
use minichat_shared::errors::{AppError, AppResult, ErrorCode};
use minichat_shared::types::auth::TokenPair;
use minichat_shared::types::ApiResponse;

use crate::models::User;
use crate::schema::users;
use crate::services::{auth_service, token_service};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn invalid_credentials() -> AppError {
    AppError::new(ErrorCode::InvalidCredentials, "invalid email or password")
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let mut conn = checkout(&state.db)?;

    let user: User = users::table
        .filter(users::email.eq(auth_service::normalize_email(&req.email)))
        .first(&mut conn)
        .optional()?
        .ok_or_else(invalid_credentials)?;

    // Google-only accounts have no password to check against
    let hash = user.password_hash.as_deref().ok_or_else(invalid_credentials)?;
    if !auth_service::verify_password(&req.password, hash)? {
        return Err(invalid_credentials());
    }

    let token_pair = token_service::issue_session(&mut conn, &user, &state.config)?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(ApiResponse::ok(token_pair)))
}
