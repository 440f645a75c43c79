use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use minichat_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Group, MemberView, Membership, Message, NewMessage, UserSummary};
use crate::store::ChatStore;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserSummary>,
    groups: HashMap<Uuid, Group>,
    members: BTreeMap<(Uuid, Uuid), Membership>,
    messages: BTreeMap<i64, Message>,
    last_message_id: i64,
}

/// In-process store behind a single lock. Backs the service tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users are owned by the auth service; this seeds them.
    pub fn add_user(&self, name: &str, email: &str) -> UserSummary {
        let user = UserSummary {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
        };
        self.tables.write().users.insert(user.id, user.clone());
        user
    }

    pub fn message_count(&self) -> usize {
        self.tables.read().messages.len()
    }

    pub fn membership_count(&self, group_id: Uuid) -> usize {
        self.tables
            .read()
            .members
            .keys()
            .filter(|(g, _)| *g == group_id)
            .count()
    }
}

/// Newest first, ties broken by id, at most `limit`.
fn newest<'a>(rows: impl Iterator<Item = &'a Message>, limit: i64) -> Vec<Message> {
    let mut rows: Vec<Message> = rows.cloned().collect();
    rows.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then(b.id.cmp(&a.id)));
    rows.truncate(usize::try_from(limit).unwrap_or(0));
    rows
}

impl ChatStore for MemoryStore {
    fn find_user(&self, id: Uuid) -> AppResult<Option<UserSummary>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    fn list_users_except(&self, id: Uuid) -> AppResult<Vec<UserSummary>> {
        let tables = self.tables.read();
        let mut list: Vec<UserSummary> = tables.users.values().filter(|u| u.id != id).cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    fn create_group(&self, group: &Group, members: &[Membership]) -> AppResult<()> {
        let mut tables = self.tables.write();
        if tables.groups.contains_key(&group.id) {
            return Err(AppError::new(ErrorCode::Conflict, "group already exists"));
        }
        tables.groups.insert(group.id, group.clone());
        for m in members {
            tables.members.insert((m.group_id, m.user_id), m.clone());
        }
        Ok(())
    }

    fn find_group(&self, id: Uuid) -> AppResult<Option<Group>> {
        Ok(self.tables.read().groups.get(&id).cloned())
    }

    fn rename_group(&self, id: Uuid, name: &str) -> AppResult<bool> {
        let mut tables = self.tables.write();
        Ok(match tables.groups.get_mut(&id) {
            Some(group) => {
                group.name = name.to_string();
                true
            }
            None => false,
        })
    }

    fn delete_group(&self, id: Uuid) -> AppResult<Option<Vec<String>>> {
        let mut tables = self.tables.write();
        if tables.groups.remove(&id).is_none() {
            return Ok(None);
        }
        let attachments = tables
            .messages
            .values()
            .filter(|m| m.group_id == Some(id))
            .filter_map(|m| m.file_path.clone())
            .collect();
        tables.members.retain(|(g, _), _| *g != id);
        tables.messages.retain(|_, m| m.group_id != Some(id));
        Ok(Some(attachments))
    }

    fn groups_for_user(&self, user_id: Uuid) -> AppResult<Vec<Group>> {
        let tables = self.tables.read();
        let mut list: Vec<Group> = tables
            .members
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| tables.groups.get(&m.group_id).cloned())
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    fn find_membership(&self, group_id: Uuid, user_id: Uuid) -> AppResult<Option<Membership>> {
        Ok(self.tables.read().members.get(&(group_id, user_id)).cloned())
    }

    fn insert_membership(&self, membership: &Membership) -> AppResult<()> {
        let mut tables = self.tables.write();
        let key = (membership.group_id, membership.user_id);
        if tables.members.contains_key(&key) {
            return Err(AppError::new(ErrorCode::MemberAlreadyExists, "user is already a member of this group"));
        }
        tables.members.insert(key, membership.clone());
        Ok(())
    }

    fn delete_membership(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        Ok(self.tables.write().members.remove(&(group_id, user_id)).is_some())
    }

    fn set_admin(&self, group_id: Uuid, user_id: Uuid, is_admin: bool) -> AppResult<bool> {
        let mut tables = self.tables.write();
        Ok(match tables.members.get_mut(&(group_id, user_id)) {
            Some(m) => {
                m.is_admin = is_admin;
                true
            }
            None => false,
        })
    }

    fn list_members(&self, group_id: Uuid) -> AppResult<Vec<MemberView>> {
        let tables = self.tables.read();
        let mut list: Vec<MemberView> = tables
            .members
            .values()
            .filter(|m| m.group_id == group_id)
            .map(|m| MemberView {
                user_id: m.user_id,
                name: tables.users.get(&m.user_id).map(|u| u.name.clone()).unwrap_or_default(),
                is_admin: m.is_admin,
                chat_history_visible_from: m.chat_history_visible_from,
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    fn member_ids(&self, group_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .tables
            .read()
            .members
            .values()
            .filter(|m| m.group_id == group_id)
            .map(|m| m.user_id)
            .collect())
    }

    fn insert_message(&self, message: &NewMessage) -> AppResult<Message> {
        let mut tables = self.tables.write();
        tables.last_message_id += 1;
        let stored = Message {
            id: tables.last_message_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            group_id: message.group_id,
            content: message.content.clone(),
            file_path: message.file_path.clone(),
            sent_at: message.sent_at,
        };
        tables.messages.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn find_message(&self, id: i64) -> AppResult<Option<Message>> {
        Ok(self.tables.read().messages.get(&id).cloned())
    }

    fn update_message_content(&self, id: i64, content: &str) -> AppResult<Option<Message>> {
        let mut tables = self.tables.write();
        Ok(tables.messages.get_mut(&id).map(|m| {
            m.content = Some(content.to_string());
            m.clone()
        }))
    }

    fn delete_message(&self, id: i64) -> AppResult<bool> {
        Ok(self.tables.write().messages.remove(&id).is_some())
    }

    fn direct_history(&self, a: Uuid, b: Uuid, before: DateTime<Utc>, limit: i64) -> AppResult<Vec<Message>> {
        let tables = self.tables.read();
        let rows = tables.messages.values().filter(|m| {
            m.group_id.is_none()
                && ((m.sender_id == a && m.receiver_id == Some(b))
                    || (m.sender_id == b && m.receiver_id == Some(a)))
                && m.sent_at <= before
        });
        Ok(newest(rows, limit))
    }

    fn group_history(
        &self,
        group_id: Uuid,
        visible_from: Option<DateTime<Utc>>,
        before: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Message>> {
        let tables = self.tables.read();
        let rows = tables.messages.values().filter(|m| {
            m.group_id == Some(group_id)
                && m.sent_at <= before
                && visible_from.map_or(true, |from| m.sent_at >= from)
        });
        Ok(newest(rows, limit))
    }

    fn search_messages(&self, user_id: Uuid, query: &str, limit: i64) -> AppResult<Vec<Message>> {
        let needle = query.to_lowercase();
        let tables = self.tables.read();
        let rows = tables.messages.values().filter(|m| {
            m.involves(user_id)
                && m.content
                    .as_deref()
                    .map_or(false, |c| c.to_lowercase().contains(&needle))
        });
        Ok(newest(rows, limit))
    }
}
