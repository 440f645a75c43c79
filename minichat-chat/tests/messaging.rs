mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use minichat_chat::hub::ChatEvent;
use minichat_chat::models::{Conversation, Target};
use minichat_chat::services::ChatService;
use minichat_chat::store::{ChatStore, MemoryStore};
use minichat_shared::errors::{ErrorCode, ErrorKind};
use minichat_shared::types::pagination::CursorParams;

use common::{sorted, FailingNotifier, Harness};

#[test]
fn direct_message_reaches_both_participants() {
    let h = Harness::new();
    let (alice, bob) = (h.user("Alice"), h.user("Bob"));

    let sent = h.chat.send_message(alice.id, Target::User(bob.id), "hello").unwrap();

    let (audience, event) = h.notifier.last().unwrap();
    assert_eq!(audience, sorted(vec![alice.id, bob.id]));
    assert_eq!(event, ChatEvent::NewMessage { message: sent });
}

#[test]
fn group_message_reaches_current_members_only() {
    let h = Harness::new();
    let (a, b, c) = (h.user("A"), h.user("B"), h.user("C"));
    let group = h.chat.create_group(a.id, "G", &[b.id]).unwrap().group;

    h.chat.send_message(b.id, Target::Group(group.id), "hey all").unwrap();

    let (audience, event) = h.notifier.last().unwrap();
    assert_eq!(audience, sorted(vec![a.id, b.id]));
    assert!(!audience.contains(&c.id));
    assert_eq!(event.name(), "new_message");
}

#[test]
fn empty_content_is_rejected_without_side_effects() {
    let h = Harness::new();
    let (alice, bob) = (h.user("Alice"), h.user("Bob"));

    let err = h.chat.send_message(alice.id, Target::User(bob.id), "  ").unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::EmptyMessage));
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert_eq!(h.store.message_count(), 0);
    assert!(h.notifier.events().is_empty());
}

#[test]
fn sending_to_an_unknown_user_fails() {
    let h = Harness::new();
    let alice = h.user("Alice");

    let err = h.chat.send_message(alice.id, Target::User(uuid::Uuid::new_v4()), "anyone?").unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::UserNotFound));
    assert_eq!(h.store.message_count(), 0);
}

#[test]
fn outsiders_cannot_post_to_a_group() {
    let h = Harness::new();
    let (a, outsider) = (h.user("A"), h.user("Mallory"));
    let group = h.chat.create_group(a.id, "G", &[]).unwrap().group;

    let err = h.chat.send_message(outsider.id, Target::Group(group.id), "let me in").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(h.store.message_count(), 0);
}

#[test]
fn failed_delivery_does_not_fail_the_send() {
    let store = Arc::new(MemoryStore::new());
    let chat = ChatService::new(store.clone(), Arc::new(FailingNotifier), 100);
    let alice = store.add_user("Alice", "alice@example.com");
    let bob = store.add_user("Bob", "bob@example.com");

    let sent = chat.send_message(alice.id, Target::User(bob.id), "still stored").unwrap();

    assert_eq!(store.find_message(sent.id).unwrap(), Some(sent));
}

#[test]
fn only_the_sender_can_edit() {
    let h = Harness::new();
    let (alice, bob) = (h.user("Alice"), h.user("Bob"));
    let sent = h.chat.send_message(alice.id, Target::User(bob.id), "helo").unwrap();

    let err = h.chat.edit_message(sent.id, bob.id, "hijacked").unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NotMessageOwner));
    assert_eq!(h.store.find_message(sent.id).unwrap().unwrap().content.as_deref(), Some("helo"));

    let edited = h.chat.edit_message(sent.id, alice.id, "hello").unwrap();
    assert_eq!(edited.content.as_deref(), Some("hello"));
    assert_eq!((edited.id, edited.sender_id, edited.sent_at), (sent.id, sent.sender_id, sent.sent_at));

    let (audience, event) = h.notifier.last().unwrap();
    assert_eq!(audience, sorted(vec![alice.id, bob.id]));
    assert_eq!(
        event,
        ChatEvent::MessageEdited {
            id: sent.id,
            content: "hello".into(),
            conversation: Conversation::direct(alice.id, bob.id),
        }
    );
}

#[test]
fn edits_are_validated_like_new_messages() {
    let h = Harness::new();
    let (alice, bob) = (h.user("Alice"), h.user("Bob"));
    let sent = h.chat.send_message(alice.id, Target::User(bob.id), "draft").unwrap();

    let err = h.chat.edit_message(sent.id, alice.id, "").unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::EmptyMessage));

    let err = h.chat.edit_message(9_999, alice.id, "ghost").unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MessageNotFound));
}

#[test]
fn deleted_messages_leave_history() {
    let h = Harness::new();
    let (alice, bob) = (h.user("Alice"), h.user("Bob"));
    let keep = h.chat.send_message(alice.id, Target::User(bob.id), "keep").unwrap();
    let gone = h.chat.send_message(alice.id, Target::User(bob.id), "oops").unwrap();

    let err = h.chat.delete_message(gone.id, bob.id).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NotMessageOwner));

    h.chat.delete_message(gone.id, alice.id).unwrap();
    let (_, event) = h.notifier.last().unwrap();
    assert_eq!(
        event,
        ChatEvent::MessageDeleted { id: gone.id, conversation: Conversation::direct(alice.id, bob.id) }
    );

    let history = h.chat.history(bob.id, Target::User(alice.id), &CursorParams::default()).unwrap();
    assert_eq!(history.messages, vec![keep]);

    let err = h.chat.delete_message(gone.id, alice.id).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MessageNotFound));
}

#[test]
fn search_covers_only_the_requesters_messages() {
    let h = Harness::new();
    let (alice, bob, carol) = (h.user("Alice"), h.user("Bob"), h.user("Carol"));
    h.chat.send_message(alice.id, Target::User(bob.id), "Pizza tonight?").unwrap();
    h.chat.send_message(bob.id, Target::User(alice.id), "pizza sounds good").unwrap();
    h.chat.send_message(bob.id, Target::User(carol.id), "pizza with alice later").unwrap();

    let found = h.chat.search(alice.id, "PIZZA").unwrap();
    let contents: Vec<_> = found.iter().filter_map(|m| m.content.as_deref()).collect();
    assert_eq!(contents, vec!["pizza sounds good", "Pizza tonight?"]);

    let err = h.chat.search(alice.id, "   ").unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::ValidationError));
}

#[test]
fn attachments_are_readable_by_participants_only() {
    let h = Harness::new();
    let (alice, bob, eve) = (h.user("Alice"), h.user("Bob"), h.user("Eve"));
    let sent = h
        .chat
        .send_attachment(alice.id, Target::User(bob.id), "0_photo.png".into())
        .unwrap();
    assert!(sent.is_attachment());

    assert_eq!(h.chat.attachment_path(sent.id, bob.id).unwrap(), "0_photo.png");
    assert_eq!(h.chat.attachment_path(sent.id, alice.id).unwrap(), "0_photo.png");

    let err = h.chat.attachment_path(sent.id, eve.id).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Forbidden));
}

#[test]
fn deleting_an_attachment_hands_back_its_stored_name() {
    let h = Harness::new();
    let (alice, bob) = (h.user("Alice"), h.user("Bob"));
    let sent = h
        .chat
        .send_attachment(alice.id, Target::User(bob.id), "0_scan.pdf".into())
        .unwrap();

    let deleted = h.chat.delete_message(sent.id, alice.id).unwrap();
    assert_eq!(deleted.file_path.as_deref(), Some("0_scan.pdf"));
    assert_eq!(h.store.message_count(), 0);
}

#[test]
fn group_attachments_follow_membership() {
    let h = Harness::new();
    let (a, b, eve) = (h.user("A"), h.user("B"), h.user("Eve"));
    let group = h.chat.create_group(a.id, "G", &[b.id]).unwrap().group;
    let sent = h.chat.send_attachment(a.id, Target::Group(group.id), "0_minutes.pdf".into()).unwrap();
    let text = h.chat.send_message(a.id, Target::Group(group.id), "no file here").unwrap();

    assert_eq!(h.chat.attachment_path(sent.id, b.id).unwrap(), "0_minutes.pdf");
    assert_eq!(h.chat.attachment_path(sent.id, eve.id).unwrap_err().code(), Some(ErrorCode::Forbidden));
    assert_eq!(h.chat.attachment_path(text.id, b.id).unwrap_err().code(), Some(ErrorCode::FileNotFound));
}
