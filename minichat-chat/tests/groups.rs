mod common;

use pretty_assertions::assert_eq;
use uuid::Uuid;

use minichat_chat::hub::ChatEvent;
use minichat_chat::models::Target;
use minichat_chat::services::groups::HistoryPolicy;
use minichat_chat::store::ChatStore;
use minichat_shared::errors::{ErrorCode, ErrorKind};

use common::{sorted, Harness};

#[test]
fn creator_becomes_the_only_admin() {
    let h = Harness::new();
    let (a, b, c) = (h.user("A"), h.user("B"), h.user("C"));

    let details = h.chat.create_group(a.id, "  Book club ", &[b.id, c.id, b.id, a.id]).unwrap();

    assert_eq!(details.group.name, "Book club");
    let roster: Vec<_> = details.members.iter().map(|m| (m.user_id, m.is_admin)).collect();
    assert_eq!(roster, vec![(a.id, true), (b.id, false), (c.id, false)]);
    assert_eq!(h.store.membership_count(details.group.id), 3);
    assert!(h.chat.can_manage_group(details.group.id, a.id).unwrap());
    assert!(!h.chat.can_manage_group(details.group.id, b.id).unwrap());
}

#[test]
fn creation_rejects_blank_names_and_unknown_members() {
    let h = Harness::new();
    let a = h.user("A");

    let err = h.chat.create_group(a.id, "   ", &[]).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::GroupNameRequired));

    let err = h.chat.create_group(a.id, "G", &[Uuid::new_v4()]).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::UserNotFound));
}

#[test]
fn adding_an_existing_member_conflicts() {
    let h = Harness::new();
    let (a, b) = (h.user("A"), h.user("B"));
    let group = h.chat.create_group(a.id, "G", &[b.id]).unwrap().group;

    let err = h.chat.add_member(group.id, a.id, b.id, HistoryPolicy::ShowAll).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MemberAlreadyExists));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.store.membership_count(group.id), 2);
}

#[test]
fn member_management_needs_an_admin() {
    let h = Harness::new();
    let (a, b, c, outsider) = (h.user("A"), h.user("B"), h.user("C"), h.user("Mallory"));
    let group = h.chat.create_group(a.id, "G", &[b.id]).unwrap().group;

    for actor in [b.id, outsider.id] {
        let attempts = [
            h.chat.add_member(group.id, actor, c.id, HistoryPolicy::NoHistory).map(drop),
            h.chat.remove_member(group.id, actor, a.id),
            h.chat.make_admin(group.id, actor, b.id),
            h.chat.rename_group(group.id, actor, "Taken over").map(drop),
            h.chat.delete_group(group.id, actor).map(drop),
        ];
        for result in attempts {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::Forbidden);
        }
    }

    assert_eq!(h.store.membership_count(group.id), 2);
    assert_eq!(h.store.find_group(group.id).unwrap().unwrap().name, "G");
}

#[test]
fn removing_or_promoting_a_non_member_is_not_found() {
    let h = Harness::new();
    let (a, stranger) = (h.user("A"), h.user("Stranger"));
    let group = h.chat.create_group(a.id, "G", &[]).unwrap().group;

    let err = h.chat.remove_member(group.id, a.id, stranger.id).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MemberNotFound));
    let err = h.chat.make_admin(group.id, a.id, stranger.id).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MemberNotFound));
}

#[test]
fn operations_on_a_missing_group_are_not_found() {
    let h = Harness::new();
    let (a, b) = (h.user("A"), h.user("B"));
    let missing = Uuid::new_v4();

    let err = h.chat.add_member(missing, a.id, b.id, HistoryPolicy::ShowAll).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::GroupNotFound));
    let err = h.chat.delete_group(missing, a.id).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::GroupNotFound));
}

#[test]
fn promoted_members_can_manage() {
    let h = Harness::new();
    let (a, b, c) = (h.user("A"), h.user("B"), h.user("C"));
    let group = h.chat.create_group(a.id, "G", &[b.id]).unwrap().group;

    h.chat.make_admin(group.id, a.id, b.id).unwrap();
    h.chat.add_member(group.id, b.id, c.id, HistoryPolicy::LastDays(2)).unwrap();

    assert_eq!(h.store.membership_count(group.id), 3);
}

#[test]
fn removed_members_lose_access() {
    let h = Harness::new();
    let (a, b) = (h.user("A"), h.user("B"));
    let group = h.chat.create_group(a.id, "G", &[b.id]).unwrap().group;

    h.chat.remove_member(group.id, a.id, b.id).unwrap();

    let err = h.chat.send_message(b.id, Target::Group(group.id), "still here?").unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NotGroupMember));
}

#[test]
fn rename_is_broadcast_to_members() {
    let h = Harness::new();
    let (a, b) = (h.user("A"), h.user("B"));
    let group = h.chat.create_group(a.id, "G", &[b.id]).unwrap().group;

    let renamed = h.chat.rename_group(group.id, a.id, " Climbing ").unwrap();
    assert_eq!(renamed.name, "Climbing");

    let (audience, event) = h.notifier.last().unwrap();
    assert_eq!(audience, sorted(vec![a.id, b.id]));
    assert_eq!(event, ChatEvent::GroupRenamed { group_id: group.id, name: "Climbing".into() });
}

#[test]
fn deleting_a_group_removes_everything_and_tells_former_members() {
    let h = Harness::new();
    let (a, b, c) = (h.user("A"), h.user("B"), h.user("C"));
    let group = h.chat.create_group(a.id, "G", &[b.id, c.id]).unwrap().group;
    h.chat.send_message(b.id, Target::Group(group.id), "bye").unwrap();
    let direct = h.chat.send_message(a.id, Target::User(b.id), "unrelated").unwrap();

    let attachments = h.chat.delete_group(group.id, a.id).unwrap();
    assert!(attachments.is_empty());

    assert!(h.store.find_group(group.id).unwrap().is_none());
    assert_eq!(h.store.membership_count(group.id), 0);
    assert_eq!(h.store.message_count(), 1);
    assert!(h.store.find_message(direct.id).unwrap().is_some());

    let (audience, event) = h.notifier.last().unwrap();
    assert_eq!(audience, sorted(vec![a.id, b.id, c.id]));
    assert_eq!(event, ChatEvent::GroupDeleted { group_id: group.id });
}

#[test]
fn deleting_a_group_reports_its_attachments() {
    let h = Harness::new();
    let (a, b) = (h.user("A"), h.user("B"));
    let group = h.chat.create_group(a.id, "G", &[b.id]).unwrap().group;
    h.chat.send_attachment(a.id, Target::Group(group.id), "0_agenda.pdf".into()).unwrap();
    h.chat.send_attachment(b.id, Target::Group(group.id), "1_photo.jpg".into()).unwrap();
    h.chat.send_message(b.id, Target::Group(group.id), "text only").unwrap();
    h.chat.send_attachment(a.id, Target::User(b.id), "2_private.txt".into()).unwrap();

    let mut attachments = h.chat.delete_group(group.id, a.id).unwrap();
    attachments.sort();

    assert_eq!(attachments, vec!["0_agenda.pdf".to_string(), "1_photo.jpg".to_string()]);
    assert_eq!(h.store.message_count(), 1);
}

#[test]
fn directory_lists_other_users_and_own_groups() {
    let h = Harness::new();
    let (a, b, c) = (h.user("A"), h.user("B"), h.user("C"));
    let mine = h.chat.create_group(a.id, "Mine", &[b.id]).unwrap().group;
    h.chat.create_group(c.id, "Theirs", &[]).unwrap();

    let directory = h.chat.directory(a.id, false).unwrap();
    let names: Vec<_> = directory.users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["B", "C"]);
    assert_eq!(directory.groups.unwrap(), vec![mine]);

    assert!(h.chat.directory(a.id, true).unwrap().groups.is_none());
}
