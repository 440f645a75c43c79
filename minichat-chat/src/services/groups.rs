use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use minichat_shared::errors::{AppError, AppResult, ErrorCode};

use crate::hub::ChatEvent;
use crate::models::{Conversation, Group, MemberView, Membership};
use crate::services::ChatService;

pub const MAX_GROUP_NAME_CHARS: usize = 50;

/// How much earlier group history a newly added member may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    All,
    Days,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryPolicy {
    /// Everything since the group was created.
    ShowAll,
    LastDays(u32),
    NoHistory,
}

impl HistoryPolicy {
    pub fn from_request(mode: HistoryMode, days: Option<u32>) -> AppResult<Self> {
        match mode {
            HistoryMode::All => Ok(HistoryPolicy::ShowAll),
            HistoryMode::None => Ok(HistoryPolicy::NoHistory),
            HistoryMode::Days => days.map(HistoryPolicy::LastDays).ok_or_else(|| {
                AppError::new(ErrorCode::ValidationError, "days is required when history is 'days'")
            }),
        }
    }

    /// Cutoff for a member joining `group` at `now`. Depends only on the group,
    /// never on who else is still a member.
    pub fn visible_from(&self, group: &Group, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            HistoryPolicy::ShowAll => Some(group.created_at),
            HistoryPolicy::LastDays(days) => Some(now - Duration::days(i64::from(*days))),
            HistoryPolicy::NoHistory => Some(now),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupDetails {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<MemberView>,
}

pub fn normalize_group_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::new(ErrorCode::GroupNameRequired, "group name is required"));
    }
    if name.chars().count() > MAX_GROUP_NAME_CHARS {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            format!("group name cannot exceed {MAX_GROUP_NAME_CHARS} characters"),
        ));
    }
    Ok(name.to_string())
}

impl ChatService {
    /// Creates a group whose creator is its first admin. Every initial
    /// member starts reading from the creation time.
    pub fn create_group(&self, creator: Uuid, name: &str, members: &[Uuid]) -> AppResult<GroupDetails> {
        let name = normalize_group_name(name)?;

        let others: BTreeSet<Uuid> = members.iter().copied().filter(|id| *id != creator).collect();
        for user_id in &others {
            if self.store.find_user(*user_id)?.is_none() {
                return Err(AppError::new(ErrorCode::UserNotFound, format!("user {user_id} not found")));
            }
        }

        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4(),
            name,
            created_at: now,
        };
        let memberships: Vec<Membership> = std::iter::once((creator, true))
            .chain(others.iter().map(|id| (*id, false)))
            .map(|(user_id, is_admin)| Membership {
                group_id: group.id,
                user_id,
                is_admin,
                chat_history_visible_from: Some(now),
                joined_at: now,
            })
            .collect();

        self.store.create_group(&group, &memberships)?;
        tracing::info!(group_id = %group.id, user_id = %creator, members = memberships.len(), "group created");

        let members = self.store.list_members(group.id)?;
        Ok(GroupDetails { group, members })
    }

    pub fn add_member(
        &self,
        group_id: Uuid,
        actor: Uuid,
        member_id: Uuid,
        policy: HistoryPolicy,
    ) -> AppResult<Membership> {
        let group = self.require_group(group_id)?;
        self.require_admin(group_id, actor)?;

        if self.store.find_user(member_id)?.is_none() {
            return Err(AppError::new(ErrorCode::UserNotFound, "user not found"));
        }
        if self.store.find_membership(group_id, member_id)?.is_some() {
            return Err(AppError::new(ErrorCode::MemberAlreadyExists, "user is already a member of this group"));
        }

        let now = Utc::now();
        let membership = Membership {
            group_id,
            user_id: member_id,
            is_admin: false,
            chat_history_visible_from: policy.visible_from(&group, now),
            joined_at: now,
        };
        self.store.insert_membership(&membership)?;

        tracing::info!(
            group_id = %group_id,
            user_id = %actor,
            member_id = %member_id,
            policy = ?policy,
            "member added"
        );
        Ok(membership)
    }

    pub fn remove_member(&self, group_id: Uuid, actor: Uuid, member_id: Uuid) -> AppResult<()> {
        self.require_group(group_id)?;
        self.require_admin(group_id, actor)?;

        if !self.store.delete_membership(group_id, member_id)? {
            return Err(AppError::new(ErrorCode::MemberNotFound, "user is not a member of this group"));
        }

        tracing::info!(group_id = %group_id, user_id = %actor, member_id = %member_id, "member removed");
        Ok(())
    }

    pub fn make_admin(&self, group_id: Uuid, actor: Uuid, member_id: Uuid) -> AppResult<()> {
        self.require_group(group_id)?;
        self.require_admin(group_id, actor)?;

        if !self.store.set_admin(group_id, member_id, true)? {
            return Err(AppError::new(ErrorCode::MemberNotFound, "user is not a member of this group"));
        }

        tracing::info!(group_id = %group_id, user_id = %actor, member_id = %member_id, "member promoted to admin");
        Ok(())
    }

    pub fn rename_group(&self, group_id: Uuid, actor: Uuid, name: &str) -> AppResult<Group> {
        self.require_group(group_id)?;
        self.require_admin(group_id, actor)?;
        let name = normalize_group_name(name)?;

        if !self.store.rename_group(group_id, &name)? {
            return Err(AppError::new(ErrorCode::GroupNotFound, "group not found"));
        }
        tracing::info!(group_id = %group_id, user_id = %actor, "group renamed");

        self.broadcast(
            &Conversation::Group { group_id },
            ChatEvent::GroupRenamed { group_id, name },
        );
        self.require_group(group_id)
    }

    /// Deletes the group with its memberships and messages. Returns the stored
    /// names of the attachments that went with it.
    pub fn delete_group(&self, group_id: Uuid, actor: Uuid) -> AppResult<Vec<String>> {
        self.require_group(group_id)?;
        self.require_admin(group_id, actor)?;

        // Members are gone after the delete, so the audience is captured first
        let audience = self.store.member_ids(group_id)?;
        let attachments = self
            .store
            .delete_group(group_id)?
            .ok_or_else(|| AppError::new(ErrorCode::GroupNotFound, "group not found"))?;
        tracing::info!(group_id = %group_id, user_id = %actor, attachments = attachments.len(), "group deleted");

        self.broadcast_to(&audience, ChatEvent::GroupDeleted { group_id });
        Ok(attachments)
    }
}
