#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use minichat_chat::hub::{ChatEvent, Notifier};
use minichat_chat::models::UserSummary;
use minichat_chat::services::ChatService;
use minichat_chat::store::MemoryStore;

/// Captures every delivery instead of emitting it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(Vec<Uuid>, ChatEvent)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, audience: &[Uuid], event: &ChatEvent) -> anyhow::Result<()> {
        let mut audience = audience.to_vec();
        audience.sort();
        self.sent.lock().push((audience, event.clone()));
        Ok(())
    }
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(Vec<Uuid>, ChatEvent)> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> Option<(Vec<Uuid>, ChatEvent)> {
        self.sent.lock().last().cloned()
    }
}

pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _audience: &[Uuid], _event: &ChatEvent) -> anyhow::Result<()> {
        anyhow::bail!("socket layer down")
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub chat: ChatService,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let chat = ChatService::new(store.clone(), notifier.clone(), 100);
        Self { store, notifier, chat }
    }

    pub fn user(&self, name: &str) -> UserSummary {
        self.store.add_user(name, &format!("{}@example.com", name.to_lowercase()))
    }
}

pub fn sorted(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    ids.sort();
    ids
}
