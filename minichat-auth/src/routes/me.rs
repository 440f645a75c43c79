use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use minichat_shared::clients::db::checkout;
use minichat_shared::errors::{AppError, AppResult, ErrorCode};
use minichat_shared::types::auth::AuthUser;
use minichat_shared::types::ApiResponse;

use crate::models::User;
use crate::schema::users;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
    pub has_password: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<MeResponse>>> {
    let mut conn = checkout(&state.db)?;

    let found = users::table
        .filter(users::id.eq(user.id))
        .first::<User>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;

    Ok(Json(ApiResponse::ok(MeResponse {
        id: found.id,
        name: found.name,
        email: found.email,
        has_password: found.password_hash.is_some(),
        created_at: found.created_at,
    })))
}
