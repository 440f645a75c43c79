use serde::Serialize;
use uuid::Uuid;

use minichat_shared::errors::AppResult;

use crate::models::{Group, UserSummary};
use crate::services::ChatService;

/// Everyone the requester can open a conversation with.
#[derive(Debug, Serialize)]
pub struct Directory {
    pub users: Vec<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<Group>>,
}

impl ChatService {
    /// Every other user, plus the requester's groups unless `only_users`.
    pub fn directory(&self, requester: Uuid, only_users: bool) -> AppResult<Directory> {
        let users = self.store.list_users_except(requester)?;
        let groups = if only_users {
            None
        } else {
            Some(self.store.groups_for_user(requester)?)
        };
        Ok(Directory { users, groups })
    }
}
