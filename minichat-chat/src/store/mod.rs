pub mod memory;
pub mod pg;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use minichat_shared::errors::AppResult;

use crate::models::{Group, MemberView, Membership, Message, NewMessage, UserSummary};

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Persistence for users (read-only), groups, memberships and messages.
///
/// Every call is a single unit of work; multi-row mutations (group creation
/// and deletion) are atomic. History queries return the newest `limit`
/// eligible rows, newest first, ties broken by id.
pub trait ChatStore: Send + Sync {
    fn find_user(&self, id: Uuid) -> AppResult<Option<UserSummary>>;
    fn list_users_except(&self, id: Uuid) -> AppResult<Vec<UserSummary>>;

    /// Inserts the group and its initial memberships together.
    fn create_group(&self, group: &Group, members: &[Membership]) -> AppResult<()>;
    fn find_group(&self, id: Uuid) -> AppResult<Option<Group>>;
    fn rename_group(&self, id: Uuid, name: &str) -> AppResult<bool>;
    /// Removes the group with its memberships and messages. Returns the stored
    /// file names of the removed attachments, or None when the group is absent.
    fn delete_group(&self, id: Uuid) -> AppResult<Option<Vec<String>>>;
    fn groups_for_user(&self, user_id: Uuid) -> AppResult<Vec<Group>>;

    fn find_membership(&self, group_id: Uuid, user_id: Uuid) -> AppResult<Option<Membership>>;
    /// Fails with a conflict when the (group, user) pair already exists.
    fn insert_membership(&self, membership: &Membership) -> AppResult<()>;
    fn delete_membership(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool>;
    fn set_admin(&self, group_id: Uuid, user_id: Uuid, is_admin: bool) -> AppResult<bool>;
    fn list_members(&self, group_id: Uuid) -> AppResult<Vec<MemberView>>;
    fn member_ids(&self, group_id: Uuid) -> AppResult<Vec<Uuid>>;

    fn insert_message(&self, message: &NewMessage) -> AppResult<Message>;
    fn find_message(&self, id: i64) -> AppResult<Option<Message>>;
    fn update_message_content(&self, id: i64, content: &str) -> AppResult<Option<Message>>;
    fn delete_message(&self, id: i64) -> AppResult<bool>;

    /// Direct messages between `a` and `b` with `sent_at <= before`.
    fn direct_history(&self, a: Uuid, b: Uuid, before: DateTime<Utc>, limit: i64) -> AppResult<Vec<Message>>;
    /// Group messages with `visible_from <= sent_at <= before`.
    fn group_history(
        &self,
        group_id: Uuid,
        visible_from: Option<DateTime<Utc>>,
        before: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Message>>;
    /// Messages sent or received by `user_id` whose content contains `query`, ignoring case. Newest first.
    fn search_messages(&self, user_id: Uuid, query: &str, limit: i64) -> AppResult<Vec<Message>>;
}
