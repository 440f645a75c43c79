use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use minichat_shared::errors::AppResult;
use minichat_shared::types::api::ApiResponse;
use minichat_shared::types::auth::AuthUser;

use crate::models::{Group, Membership};
use crate::routes::blocking;
use crate::services::groups::{GroupDetails, HistoryMode, HistoryPolicy};
use crate::AppState;

// --- Request DTOs ---

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub members: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub member_id: Uuid,
    pub history: HistoryMode,
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RenameGroupRequest {
    pub name: String,
}

// --- Response DTOs ---

#[derive(Debug, Serialize)]
pub struct MemberChange {
    pub group_id: Uuid,
    pub member_id: Uuid,
}

/// POST /groups - create a group, the caller becomes admin
pub async fn create_group(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGroupRequest>,
) -> AppResult<Json<ApiResponse<GroupDetails>>> {
    let chat = state.chat.clone();
    let details = blocking(move || chat.create_group(auth_user.id, &req.name, &req.members)).await?;
    Ok(Json(ApiResponse::ok(details)))
}

/// POST /groups/:id/members - admin adds a member with a history policy
pub async fn add_member(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> AppResult<Json<ApiResponse<Membership>>> {
    let policy = HistoryPolicy::from_request(req.history, req.days)?;
    let chat = state.chat.clone();
    let membership = blocking(move || chat.add_member(group_id, auth_user.id, req.member_id, policy)).await?;
    Ok(Json(ApiResponse::ok(membership)))
}

/// DELETE /groups/:id/members/:member_id - admin removes a member
pub async fn remove_member(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((group_id, member_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<MemberChange>>> {
    let chat = state.chat.clone();
    blocking(move || chat.remove_member(group_id, auth_user.id, member_id)).await?;
    Ok(Json(ApiResponse::ok_with_message(
        MemberChange { group_id, member_id },
        "member removed",
    )))
}

/// PUT /groups/:id/members/:member_id/admin - admin promotes a member
pub async fn make_admin(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((group_id, member_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<MemberChange>>> {
    let chat = state.chat.clone();
    blocking(move || chat.make_admin(group_id, auth_user.id, member_id)).await?;
    Ok(Json(ApiResponse::ok_with_message(
        MemberChange { group_id, member_id },
        "member is now an admin",
    )))
}

/// PUT /groups/:id/name - admin renames the group
pub async fn rename_group(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<RenameGroupRequest>,
) -> AppResult<Json<ApiResponse<Group>>> {
    let chat = state.chat.clone();
    let group = blocking(move || chat.rename_group(group_id, auth_user.id, &req.name)).await?;
    Ok(Json(ApiResponse::ok(group)))
}

/// DELETE /groups/:id - admin deletes the group and its history
pub async fn delete_group(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    let chat = state.chat.clone();
    let attachments = blocking(move || chat.delete_group(group_id, auth_user.id)).await?;
    for stored in &attachments {
        state.files.remove(stored).await;
    }
    Ok(Json(ApiResponse::ok_with_message(group_id, "group deleted")))
}
