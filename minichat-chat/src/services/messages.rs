use chrono::Utc;
use uuid::Uuid;

use minichat_shared::errors::{AppError, AppResult, ErrorCode};

use crate::hub::ChatEvent;
use crate::models::{Message, NewMessage, Target};
use crate::services::ChatService;

pub const MAX_CONTENT_CHARS: usize = 1000;
pub const SEARCH_LIMIT: i64 = 100;

pub fn validate_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::new(ErrorCode::EmptyMessage, "message content cannot be empty"));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::new(
            ErrorCode::MessageTooLong,
            format!("message content cannot exceed {MAX_CONTENT_CHARS} characters"),
        ));
    }
    Ok(())
}

impl ChatService {
    /// Direct receivers must exist; group senders must be members.
    pub fn check_can_send(&self, sender: Uuid, target: Target) -> AppResult<()> {
        match target {
            Target::User(receiver) => {
                if self.store.find_user(receiver)?.is_none() {
                    return Err(AppError::new(ErrorCode::UserNotFound, "receiver not found"));
                }
            }
            Target::Group(group_id) => {
                self.require_group(group_id)?;
                self.require_member(group_id, sender)?;
            }
        }
        Ok(())
    }

    pub fn send_message(&self, sender: Uuid, target: Target, content: &str) -> AppResult<Message> {
        validate_content(content)?;
        self.check_can_send(sender, target)?;

        let mut new = NewMessage::to(target, sender, Utc::now());
        new.content = Some(content.to_string());
        self.publish(new)
    }

    /// Persists a bare upload; `file_path` is the stored file name.
    pub fn send_attachment(&self, sender: Uuid, target: Target, file_path: String) -> AppResult<Message> {
        self.check_can_send(sender, target)?;

        let mut new = NewMessage::to(target, sender, Utc::now());
        new.file_path = Some(file_path);
        self.publish(new)
    }

    fn publish(&self, new: NewMessage) -> AppResult<Message> {
        let message = self.store.insert_message(&new)?;
        tracing::info!(
            message_id = message.id,
            sender_id = %message.sender_id,
            receiver_id = ?message.receiver_id,
            group_id = ?message.group_id,
            attachment = message.is_attachment(),
            "message sent"
        );

        if let Some(conversation) = message.conversation() {
            self.broadcast(&conversation, ChatEvent::NewMessage { message: message.clone() });
        }
        Ok(message)
    }

    pub fn edit_message(&self, message_id: i64, requester: Uuid, content: &str) -> AppResult<Message> {
        self.require_owned_message(message_id, requester)?;
        validate_content(content)?;

        // Gone between the ownership check and the update: a concurrent delete won
        let updated = self
            .store
            .update_message_content(message_id, content)?
            .ok_or_else(|| AppError::new(ErrorCode::MessageNotFound, "message not found"))?;

        tracing::info!(message_id, user_id = %requester, "message edited");

        if let Some(conversation) = updated.conversation() {
            self.broadcast(
                &conversation,
                ChatEvent::MessageEdited {
                    id: updated.id,
                    content: content.to_string(),
                    conversation,
                },
            );
        }
        Ok(updated)
    }

    /// Hard delete; returns the removed row so its attachment can be cleaned up.
    pub fn delete_message(&self, message_id: i64, requester: Uuid) -> AppResult<Message> {
        let message = self.require_owned_message(message_id, requester)?;

        if !self.store.delete_message(message_id)? {
            return Err(AppError::new(ErrorCode::MessageNotFound, "message not found"));
        }

        tracing::info!(message_id, user_id = %requester, "message deleted");

        if let Some(conversation) = message.conversation() {
            self.broadcast(&conversation, ChatEvent::MessageDeleted { id: message_id, conversation });
        }
        Ok(message)
    }

    /// Messages the requester sent or received whose content contains `query`.
    pub fn search(&self, requester: Uuid, query: &str) -> AppResult<Vec<Message>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::new(ErrorCode::ValidationError, "search query cannot be empty"));
        }
        self.store.search_messages(requester, query, SEARCH_LIMIT)
    }

    /// Stored file name of an attachment the requester may read.
    pub fn attachment_path(&self, message_id: i64, requester: Uuid) -> AppResult<String> {
        let message = self
            .store
            .find_message(message_id)?
            .ok_or_else(|| AppError::new(ErrorCode::MessageNotFound, "message not found"))?;

        let allowed = match message.group_id {
            Some(group_id) => self.store.find_membership(group_id, requester)?.is_some(),
            None => message.involves(requester),
        };
        if !allowed {
            return Err(AppError::new(ErrorCode::Forbidden, "you are not part of this conversation"));
        }

        message
            .file_path
            .ok_or_else(|| AppError::new(ErrorCode::FileNotFound, "message has no attachment"))
    }
}
