use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use minichat_shared::errors::AppResult;
use minichat_shared::types::api::ApiResponse;
use minichat_shared::types::auth::AuthUser;

use crate::routes::blocking;
use crate::services::directory::Directory;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    #[serde(default)]
    pub only_users: bool,
}

/// GET /users?only_users= - other users, and the caller's groups
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<DirectoryQuery>,
) -> AppResult<Json<ApiResponse<Directory>>> {
    let chat = state.chat.clone();
    let directory = blocking(move || chat.directory(auth_user.id, query.only_users)).await?;
    Ok(Json(ApiResponse::ok(directory)))
}
