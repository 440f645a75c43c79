use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use minichat_shared::errors::{AppError, AppResult, ErrorCode};
use minichat_shared::types::api::ApiResponse;
use minichat_shared::types::auth::AuthUser;

use crate::files::original_name;
use crate::models::{Message, Target};
use crate::routes::blocking;
use crate::AppState;

fn parse_id(field: &str, value: &str) -> AppResult<Option<Uuid>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(value)
        .map(Some)
        .map_err(|_| AppError::new(ErrorCode::InvalidTarget, format!("{field} is not a valid id")))
}

/// `inline; filename="<name>"` with characters that would break the quoting removed.
fn content_disposition(name: &str) -> HeaderValue {
    let safe: String = name
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && (c.is_ascii_graphic() || *c == ' '))
        .collect();
    HeaderValue::from_str(&format!("inline; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"))
}

/// Fields of an upload form; ids are still unchecked.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>, // (file name, bytes)
    receiver_id: Option<Uuid>,
    group_id: Option<Uuid>,
}

fn multipart_error(e: impl std::fmt::Display) -> AppError {
    AppError::new(ErrorCode::ValidationError, format!("multipart error: {e}"))
}

async fn read_upload_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("file").to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                form.file = Some((file_name, data.to_vec()));
            }
            "receiver_id" => {
                let val = field.text().await.map_err(multipart_error)?;
                form.receiver_id = parse_id("receiver_id", &val)?;
            }
            "group_id" => {
                let val = field.text().await.map_err(multipart_error)?;
                form.group_id = parse_id("group_id", &val)?;
            }
            _ => {}
        }
    }
    Ok(form)
}

/// POST /messages/upload - store a file and send it as a message
pub async fn upload(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Message>>> {
    let UploadForm { file: file_data, receiver_id, group_id } = read_upload_form(multipart).await?;

    let (file_name, data) = file_data
        .ok_or_else(|| AppError::new(ErrorCode::ValidationError, "no file provided"))?;
    let target = Target::from_ids(receiver_id, group_id)?;

    // Authorise before touching the disk so refused uploads leave nothing behind
    let chat = state.chat.clone();
    let sender = auth_user.id;
    blocking(move || chat.check_can_send(sender, target)).await?;

    let stored = state.files.save(&file_name, &data).await?;

    let chat = state.chat.clone();
    let stored_name = stored.clone();
    match blocking(move || chat.send_attachment(sender, target, stored_name)).await {
        Ok(message) => {
            tracing::info!(message_id = message.id, sender_id = %sender, size = data.len(), "attachment uploaded");
            Ok(Json(ApiResponse::ok(message)))
        }
        Err(e) => {
            state.files.remove(&stored).await;
            Err(e)
        }
    }
}

/// GET /download/:message_id - serve an attachment to a conversation participant
pub async fn download(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<i64>,
) -> AppResult<Response> {
    let chat = state.chat.clone();
    let stored = blocking(move || chat.attachment_path(message_id, auth_user.id)).await?;
    let bytes = state.files.read(&stored).await?;

    let name = original_name(&stored);
    let mime = mime_guess::from_path(name).first_or_octet_stream();
    let content_type = HeaderValue::from_str(mime.as_ref())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, content_disposition(name)),
        ],
        bytes,
    )
        .into_response())
}
