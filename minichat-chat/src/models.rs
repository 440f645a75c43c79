use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use minichat_shared::errors::{AppError, AppResult, ErrorCode};

use crate::schema::{group_members, groups, messages, users};

// --- User (read-only) ---

#[derive(Debug, Queryable, Selectable, Serialize, Clone, PartialEq)]
#[diesel(table_name = users)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

// --- Group ---

#[derive(Debug, Queryable, Selectable, Identifiable, Insertable, Serialize, Clone, PartialEq)]
#[diesel(table_name = groups)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// --- Membership ---

#[derive(Debug, Queryable, Selectable, Insertable, Serialize, Clone, PartialEq)]
#[diesel(table_name = group_members)]
pub struct Membership {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub is_admin: bool,
    /// Earliest message timestamp this member may read; None means the whole history.
    pub chat_history_visible_from: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

/// Roster entry returned alongside group history.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MemberView {
    pub user_id: Uuid,
    pub name: String,
    pub is_admin: bool,
    pub chat_history_visible_from: Option<DateTime<Utc>>,
}

// --- Message ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: i64,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub content: Option<String>,
    pub file_path: Option<String>,
    #[serde(rename = "timestamp")]
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// A bare upload: stored file, no text.
    pub fn is_attachment(&self) -> bool {
        self.file_path.is_some() && self.content.is_none()
    }

    pub fn conversation(&self) -> Option<Conversation> {
        match (self.receiver_id, self.group_id) {
            (_, Some(group_id)) => Some(Conversation::Group { group_id }),
            (Some(receiver_id), None) => Some(Conversation::direct(self.sender_id, receiver_id)),
            (None, None) => None,
        }
    }

    /// Sender or direct receiver.
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id || self.receiver_id == Some(user_id)
    }
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub content: Option<String>,
    pub file_path: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl NewMessage {
    pub fn to(target: Target, sender_id: Uuid, sent_at: DateTime<Utc>) -> Self {
        let (receiver_id, group_id) = match target {
            Target::User(id) => (Some(id), None),
            Target::Group(id) => (None, Some(id)),
        };
        Self {
            sender_id,
            receiver_id,
            group_id,
            content: None,
            file_path: None,
            sent_at,
        }
    }
}

// --- Addressing ---

/// The other end of a conversation as chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    User(Uuid),
    Group(Uuid),
}

impl Target {
    /// Exactly one of the two ids must be present.
    pub fn from_ids(user_id: Option<Uuid>, group_id: Option<Uuid>) -> AppResult<Self> {
        match (user_id, group_id) {
            (Some(id), None) => Ok(Target::User(id)),
            (None, Some(id)) => Ok(Target::Group(id)),
            (None, None) => Err(AppError::new(
                ErrorCode::InvalidTarget,
                "either a user id or a group id is required",
            )),
            (Some(_), Some(_)) => Err(AppError::new(
                ErrorCode::InvalidTarget,
                "a user id and a group id cannot both be given",
            )),
        }
    }
}

/// Conversation a mutation belongs to, as seen by real-time clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Conversation {
    Direct { participants: [Uuid; 2] },
    Group { group_id: Uuid },
}

impl Conversation {
    /// Direct conversations are keyed by the unordered pair.
    pub fn direct(a: Uuid, b: Uuid) -> Self {
        let participants = if a <= b { [a, b] } else { [b, a] };
        Conversation::Direct { participants }
    }
}
