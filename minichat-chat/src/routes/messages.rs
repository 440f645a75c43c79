use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use minichat_shared::errors::AppResult;
use minichat_shared::types::api::ApiResponse;
use minichat_shared::types::auth::AuthUser;
use minichat_shared::types::pagination::{CursorParams, SortOrder, DEFAULT_COUNT};

use crate::models::{Message, Target};
use crate::routes::blocking;
use crate::services::history::{History, NO_MORE_MESSAGES};
use crate::AppState;

// --- Request DTOs ---

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub before: Option<DateTime<Utc>>,
    pub count: Option<u32>,
    #[serde(default)]
    pub sort: SortOrder,
}

impl HistoryQuery {
    fn cursor(&self) -> CursorParams {
        CursorParams {
            before: self.before,
            count: self.count.unwrap_or(DEFAULT_COUNT),
            sort: self.sort,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

// --- Response DTOs ---

#[derive(Debug, Serialize)]
pub struct DeletedMessage {
    pub id: i64,
}

/// POST /messages - send a direct or group text message
pub async fn send_message(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let target = Target::from_ids(req.receiver_id, req.group_id)?;
    let chat = state.chat.clone();
    let message = blocking(move || chat.send_message(auth_user.id, target, &req.content)).await?;
    Ok(Json(ApiResponse::ok(message)))
}

/// PUT /messages/:id - edit content (only the sender can edit)
pub async fn edit_message(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<i64>,
    Json(req): Json<EditMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let chat = state.chat.clone();
    let message = blocking(move || chat.edit_message(message_id, auth_user.id, &req.content)).await?;
    Ok(Json(ApiResponse::ok(message)))
}

/// DELETE /messages/:id - hard delete (only the sender can delete)
pub async fn delete_message(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<i64>,
) -> AppResult<Json<ApiResponse<DeletedMessage>>> {
    let chat = state.chat.clone();
    let deleted = blocking(move || chat.delete_message(message_id, auth_user.id)).await?;
    if let Some(stored) = deleted.file_path.as_deref() {
        state.files.remove(stored).await;
    }
    Ok(Json(ApiResponse::ok_with_message(DeletedMessage { id: message_id }, "message deleted")))
}

/// GET /messages?user_id|group_id&before&count&sort - conversation history
pub async fn history(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<ApiResponse<History>>> {
    let target = Target::from_ids(query.user_id, query.group_id)?;
    let cursor = query.cursor();
    let chat = state.chat.clone();
    let history = blocking(move || chat.history(auth_user.id, target, &cursor)).await?;

    if history.messages.is_empty() {
        return Ok(Json(ApiResponse::ok_with_message(history, NO_MORE_MESSAGES)));
    }
    Ok(Json(ApiResponse::ok(history)))
}

/// GET /conversation/search?query= - search the caller's own messages
pub async fn search(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<Vec<Message>>>> {
    let chat = state.chat.clone();
    let found = blocking(move || chat.search(auth_user.id, &query.query)).await?;
    Ok(Json(ApiResponse::ok(found)))
}
