use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use minichat_shared::clients::db::{checkout, DbPool};
use minichat_shared::errors::{AppError, AppResult};

use crate::models::{Group, MemberView, Membership, Message, NewMessage, UserSummary};
use crate::schema::{group_members, groups, messages, users};
use crate::store::ChatStore;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// `%query%` with LIKE wildcards in `query` escaped.
fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl ChatStore for PgStore {
    fn find_user(&self, id: Uuid) -> AppResult<Option<UserSummary>> {
        let mut conn = checkout(&self.pool)?;
        let user = users::table
            .find(id)
            .select(UserSummary::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(user)
    }

    fn list_users_except(&self, id: Uuid) -> AppResult<Vec<UserSummary>> {
        let mut conn = checkout(&self.pool)?;
        let list = users::table
            .filter(users::id.ne(id))
            .select(UserSummary::as_select())
            .order(users::name.asc())
            .load(&mut conn)?;
        Ok(list)
    }

    fn create_group(&self, group: &Group, members: &[Membership]) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        conn.transaction::<_, AppError, _>(|conn| {
            diesel::insert_into(groups::table).values(group).execute(conn)?;
            diesel::insert_into(group_members::table).values(members).execute(conn)?;
            Ok(())
        })
    }

    fn find_group(&self, id: Uuid) -> AppResult<Option<Group>> {
        let mut conn = checkout(&self.pool)?;
        let group = groups::table
            .find(id)
            .select(Group::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(group)
    }

    fn rename_group(&self, id: Uuid, name: &str) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;
        let updated = diesel::update(groups::table.find(id))
            .set(groups::name.eq(name))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }

    fn delete_group(&self, id: Uuid) -> AppResult<Option<Vec<String>>> {
        let mut conn = checkout(&self.pool)?;
        conn.transaction::<_, AppError, _>(|conn| {
            // Row lock serialises concurrent deletes and membership changes on this group
            let locked = groups::table
                .find(id)
                .select(groups::id)
                .for_update()
                .first::<Uuid>(conn)
                .optional()?;
            if locked.is_none() {
                return Ok(None);
            }

            let attachments = messages::table
                .filter(messages::group_id.eq(id))
                .filter(messages::file_path.is_not_null())
                .select(messages::file_path.assume_not_null())
                .load::<String>(conn)?;
            let removed_messages = diesel::delete(messages::table.filter(messages::group_id.eq(id))).execute(conn)?;
            let removed_members = diesel::delete(group_members::table.filter(group_members::group_id.eq(id))).execute(conn)?;
            diesel::delete(groups::table.find(id)).execute(conn)?;

            tracing::debug!(group_id = %id, removed_messages, removed_members, "group rows deleted");
            Ok(Some(attachments))
        })
    }

    fn groups_for_user(&self, user_id: Uuid) -> AppResult<Vec<Group>> {
        let mut conn = checkout(&self.pool)?;
        let list = groups::table
            .inner_join(group_members::table)
            .filter(group_members::user_id.eq(user_id))
            .select(Group::as_select())
            .order(groups::name.asc())
            .load(&mut conn)?;
        Ok(list)
    }

    fn find_membership(&self, group_id: Uuid, user_id: Uuid) -> AppResult<Option<Membership>> {
        let mut conn = checkout(&self.pool)?;
        let membership = group_members::table
            .find((group_id, user_id))
            .select(Membership::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(membership)
    }

    fn insert_membership(&self, membership: &Membership) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        // A duplicate (group_id, user_id) hits the primary key and surfaces as a conflict
        diesel::insert_into(group_members::table)
            .values(membership)
            .execute(&mut conn)?;
        Ok(())
    }

    fn delete_membership(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;
        let deleted = diesel::delete(group_members::table.find((group_id, user_id))).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn set_admin(&self, group_id: Uuid, user_id: Uuid, is_admin: bool) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;
        let updated = diesel::update(group_members::table.find((group_id, user_id)))
            .set(group_members::is_admin.eq(is_admin))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }

    fn list_members(&self, group_id: Uuid) -> AppResult<Vec<MemberView>> {
        let mut conn = checkout(&self.pool)?;
        let rows = group_members::table
            .inner_join(users::table)
            .filter(group_members::group_id.eq(group_id))
            .select((
                group_members::user_id,
                users::name,
                group_members::is_admin,
                group_members::chat_history_visible_from,
            ))
            .order(users::name.asc())
            .load::<(Uuid, String, bool, Option<DateTime<Utc>>)>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(user_id, name, is_admin, chat_history_visible_from)| MemberView {
                user_id,
                name,
                is_admin,
                chat_history_visible_from,
            })
            .collect())
    }

    fn member_ids(&self, group_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut conn = checkout(&self.pool)?;
        let ids = group_members::table
            .filter(group_members::group_id.eq(group_id))
            .select(group_members::user_id)
            .load::<Uuid>(&mut conn)?;
        Ok(ids)
    }

    fn insert_message(&self, message: &NewMessage) -> AppResult<Message> {
        let mut conn = checkout(&self.pool)?;
        let stored = diesel::insert_into(messages::table)
            .values(message)
            .returning(Message::as_returning())
            .get_result(&mut conn)?;
        Ok(stored)
    }

    fn find_message(&self, id: i64) -> AppResult<Option<Message>> {
        let mut conn = checkout(&self.pool)?;
        let message = messages::table
            .find(id)
            .select(Message::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(message)
    }

    fn update_message_content(&self, id: i64, content: &str) -> AppResult<Option<Message>> {
        let mut conn = checkout(&self.pool)?;
        let updated = diesel::update(messages::table.find(id))
            .set(messages::content.eq(Some(content)))
            .returning(Message::as_returning())
            .get_result(&mut conn)
            .optional()?;
        Ok(updated)
    }

    fn delete_message(&self, id: i64) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;
        let deleted = diesel::delete(messages::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn direct_history(&self, a: Uuid, b: Uuid, before: DateTime<Utc>, limit: i64) -> AppResult<Vec<Message>> {
        let mut conn = checkout(&self.pool)?;
        let rows = messages::table
            .filter(messages::group_id.is_null())
            .filter(
                messages::sender_id
                    .eq(a)
                    .and(messages::receiver_id.eq(b))
                    .or(messages::sender_id.eq(b).and(messages::receiver_id.eq(a))),
            )
            .filter(messages::sent_at.le(before))
            .order((messages::sent_at.desc(), messages::id.desc()))
            .limit(limit)
            .select(Message::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    fn group_history(
        &self,
        group_id: Uuid,
        visible_from: Option<DateTime<Utc>>,
        before: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Message>> {
        let mut conn = checkout(&self.pool)?;
        let mut query = messages::table
            .filter(messages::group_id.eq(group_id))
            .filter(messages::sent_at.le(before))
            .into_boxed();
        if let Some(from) = visible_from {
            query = query.filter(messages::sent_at.ge(from));
        }
        let rows = query
            .order((messages::sent_at.desc(), messages::id.desc()))
            .limit(limit)
            .select(Message::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    fn search_messages(&self, user_id: Uuid, query: &str, limit: i64) -> AppResult<Vec<Message>> {
        let mut conn = checkout(&self.pool)?;
        let rows = messages::table
            .filter(messages::sender_id.eq(user_id).or(messages::receiver_id.eq(user_id)))
            .filter(messages::content.ilike(contains_pattern(query)))
            .order((messages::sent_at.desc(), messages::id.desc()))
            .limit(limit)
            .select(Message::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }
}
