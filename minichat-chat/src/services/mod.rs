pub mod access;
pub mod directory;
pub mod groups;
pub mod history;
pub mod messages;

use std::sync::Arc;

use uuid::Uuid;

use minichat_shared::errors::AppResult;

use crate::hub::{ChatEvent, Notifier};
use crate::models::Conversation;
use crate::store::ChatStore;

/// Chat operations over a store, with fan-out of every persisted mutation.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    notifier: Arc<dyn Notifier>,
    history_max_count: u32,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, notifier: Arc<dyn Notifier>, history_max_count: u32) -> Self {
        Self {
            store,
            notifier,
            history_max_count,
        }
    }

    pub fn store(&self) -> &dyn ChatStore {
        self.store.as_ref()
    }

    fn audience(&self, conversation: &Conversation) -> AppResult<Vec<Uuid>> {
        match conversation {
            Conversation::Direct { participants } => Ok(participants.to_vec()),
            Conversation::Group { group_id } => self.store.member_ids(*group_id),
        }
    }

    /// Fire-and-forget delivery to the conversation's current participants.
    /// Runs after the mutation is persisted; failures are logged and dropped.
    fn broadcast(&self, conversation: &Conversation, event: ChatEvent) {
        let result = self
            .audience(conversation)
            .map_err(anyhow::Error::from)
            .and_then(|audience| self.notifier.notify(&audience, &event));
        if let Err(e) = result {
            tracing::warn!(event = event.name(), error = %e, "broadcast failed");
        }
    }

    /// Like `broadcast` but for an audience captured before the mutation.
    fn broadcast_to(&self, audience: &[Uuid], event: ChatEvent) {
        if let Err(e) = self.notifier.notify(audience, &event) {
            tracing::warn!(event = event.name(), error = %e, "broadcast failed");
        }
    }
}
