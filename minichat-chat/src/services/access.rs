use uuid::Uuid;

use minichat_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Group, Membership, Message};
use crate::services::ChatService;

/// Only an existing admin membership may manage a group. A caller with no
/// membership row is refused like any other non-admin.
pub fn can_manage_group(membership: Option<&Membership>) -> bool {
    membership.map_or(false, |m| m.is_admin)
}

pub fn is_message_owner(message: &Message, user_id: Uuid) -> bool {
    message.sender_id == user_id
}

impl ChatService {
    pub fn can_manage_group(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let membership = self.store.find_membership(group_id, user_id)?;
        Ok(can_manage_group(membership.as_ref()))
    }

    pub(crate) fn require_group(&self, group_id: Uuid) -> AppResult<Group> {
        self.store
            .find_group(group_id)?
            .ok_or_else(|| AppError::new(ErrorCode::GroupNotFound, "group not found"))
    }

    pub(crate) fn require_member(&self, group_id: Uuid, user_id: Uuid) -> AppResult<Membership> {
        self.store
            .find_membership(group_id, user_id)?
            .ok_or_else(|| AppError::new(ErrorCode::NotGroupMember, "you are not a member of this group"))
    }

    pub(crate) fn require_admin(&self, group_id: Uuid, user_id: Uuid) -> AppResult<()> {
        if !self.can_manage_group(group_id, user_id)? {
            return Err(AppError::new(ErrorCode::NotGroupAdmin, "only group admins can do this"));
        }
        Ok(())
    }

    /// Loads the message and checks `user_id` sent it.
    pub(crate) fn require_owned_message(&self, message_id: i64, user_id: Uuid) -> AppResult<Message> {
        let message = self
            .store
            .find_message(message_id)?
            .ok_or_else(|| AppError::new(ErrorCode::MessageNotFound, "message not found"))?;
        if !is_message_owner(&message, user_id) {
            return Err(AppError::new(ErrorCode::NotMessageOwner, "you can only change your own messages"));
        }
        Ok(message)
    }
}
