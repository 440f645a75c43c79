use serde::Serialize;
use uuid::Uuid;

use minichat_shared::errors::{AppError, AppResult, ErrorCode};
use minichat_shared::types::pagination::{CursorParams, SortOrder};

use crate::models::{MemberView, Message, Target};
use crate::services::ChatService;

pub const NO_MORE_MESSAGES: &str = "No more conversation found";

#[derive(Debug, Serialize)]
pub struct History {
    pub messages: Vec<Message>,
    /// Current roster, for group conversations only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<MemberView>>,
    /// True when nothing older than the returned page is visible.
    pub end_of_history: bool,
}

/// Puts a newest-first page into the requested order.
fn arrange(mut newest_first: Vec<Message>, sort: SortOrder) -> Vec<Message> {
    if sort == SortOrder::Asc {
        newest_first.reverse();
    }
    newest_first
}

impl ChatService {
    /// The `count` visible messages closest to `before` (inclusive), in `sort` order.
    ///
    /// The newest `count` eligible rows are selected first and only then
    /// ordered, so both sort orders return the same page.
    pub fn history(&self, requester: Uuid, target: Target, cursor: &CursorParams) -> AppResult<History> {
        let before = cursor.before_or_now();
        let limit = cursor.limit(self.history_max_count);

        let (rows, members) = match target {
            Target::User(other) => {
                if self.store.find_user(other)?.is_none() {
                    return Err(AppError::new(ErrorCode::UserNotFound, "user not found"));
                }
                let rows = self.store.direct_history(requester, other, before, i64::from(limit))?;
                (rows, None)
            }
            Target::Group(group_id) => {
                self.require_group(group_id)?;
                let membership = self.require_member(group_id, requester)?;
                let rows = self.store.group_history(
                    group_id,
                    membership.chat_history_visible_from,
                    before,
                    i64::from(limit),
                )?;
                (rows, Some(self.store.list_members(group_id)?))
            }
        };

        let end_of_history = rows.len() < limit as usize;
        tracing::debug!(
            requester = %requester,
            target = ?target,
            returned = rows.len(),
            limit,
            end_of_history,
            "history assembled"
        );

        Ok(History {
            messages: arrange(rows, cursor.sort),
            members,
            end_of_history,
        })
    }
}
