pub mod handlers;

use std::collections::BTreeSet;

use serde::Serialize;
use socketioxide::SocketIo;
use uuid::Uuid;

use crate::models::{Conversation, Message};

/// Real-time events pushed after a mutation is persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChatEvent {
    NewMessage { message: Message },
    MessageEdited { id: i64, content: String, conversation: Conversation },
    MessageDeleted { id: i64, conversation: Conversation },
    GroupRenamed { group_id: Uuid, name: String },
    GroupDeleted { group_id: Uuid },
}

impl ChatEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::NewMessage { .. } => "new_message",
            ChatEvent::MessageEdited { .. } => "message_edited",
            ChatEvent::MessageDeleted { .. } => "message_deleted",
            ChatEvent::GroupRenamed { .. } => "group_renamed",
            ChatEvent::GroupDeleted { .. } => "group_deleted",
        }
    }
}

/// Delivers an event to every connected client of the given users.
pub trait Notifier: Send + Sync {
    fn notify(&self, audience: &[Uuid], event: &ChatEvent) -> anyhow::Result<()>;
}

pub fn user_room(user_id: Uuid) -> String {
    format!("user:{user_id}")
}

/// Socket.IO delivery: each socket sits in its user's room.
#[derive(Clone)]
pub struct SocketHub {
    io: SocketIo,
}

impl SocketHub {
    pub fn new(io: SocketIo) -> Self {
        Self { io }
    }
}

impl Notifier for SocketHub {
    fn notify(&self, audience: &[Uuid], event: &ChatEvent) -> anyhow::Result<()> {
        let recipients: BTreeSet<Uuid> = audience.iter().copied().collect();
        let mut failed = 0usize;

        for user_id in &recipients {
            if let Err(e) = self.io.to(user_room(*user_id)).emit(event.name(), event) {
                tracing::debug!(user_id = %user_id, event = event.name(), error = %e, "socket emit failed");
                failed += 1;
            }
        }

        tracing::debug!(event = event.name(), recipients = recipients.len(), failed, "event emitted");

        if failed > 0 {
            anyhow::bail!("{failed} of {} emits for {} failed", recipients.len(), event.name());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn edited_payload_carries_id_content_and_conversation() {
        let group_id = Uuid::nil();
        let event = ChatEvent::MessageEdited {
            id: 7,
            content: "fixed typo".into(),
            conversation: Conversation::Group { group_id },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(event.name(), "message_edited");
        assert_eq!(json["id"], 7);
        assert_eq!(json["content"], "fixed typo");
        assert_eq!(json["conversation"]["type"], "group");
    }

    #[test]
    fn rooms_are_per_user() {
        let id = Uuid::nil();
        assert_eq!(user_room(id), format!("user:{id}"));
    }
}
