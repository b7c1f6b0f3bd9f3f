use std::sync::Arc;

use crate::conversations::ConversationIndex;
use crate::directory::ContactDirectory;
use crate::store::{Backend, MessageDraft, Profile, SqliteBackend};
use crate::thread::MessageThread;

fn test_backend() -> Arc<dyn Backend> {
    Arc::new(SqliteBackend::new_in_memory().expect("Failed to create backend"))
}

fn seed_users(backend: &Arc<dyn Backend>) {
    for (id, first, last, email) in [
        ("alice", "Alice", "Moreau", "alice@example.com"),
        ("bob", "Bob", "Tanaka", "bob@example.com"),
        ("carol", "Carol", "Okafor", "carol@example.com"),
    ] {
        backend
            .upsert_profile(&Profile::new(id, first, last, email))
            .expect("Failed to seed profile");
    }
}

#[test]
fn test_empty_index() {
    let backend = test_backend();
    seed_users(&backend);

    let index = ConversationIndex::new(backend, "alice");
    assert!(index.refresh().expect("Failed to refresh").is_empty());
}

#[test]
fn test_contact_without_messages() {
    let backend = test_backend();
    seed_users(&backend);
    ContactDirectory::new(backend.clone(), "alice")
        .ensure_contact("bob")
        .expect("Failed to add bob");

    let conversations = ConversationIndex::new(backend, "alice")
        .refresh()
        .expect("Failed to refresh");

    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].contact.id, "bob");
    assert!(conversations[0].last_message.is_none());
    assert_eq!(conversations[0].unread_count, 0);
}

#[test]
fn test_unread_count_and_last_message() {
    let backend = test_backend();
    seed_users(&backend);
    ContactDirectory::new(backend.clone(), "alice")
        .ensure_contact("bob")
        .expect("Failed to add bob");

    for n in 1..=3 {
        backend
            .insert_message(MessageDraft::text("bob", "alice", format!("message {}", n)))
            .expect("Failed to insert message");
    }

    let index = ConversationIndex::new(backend.clone(), "alice");
    let conversations = index.refresh().expect("Failed to refresh");

    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].unread_count, 3);
    let last = conversations[0]
        .last_message
        .as_ref()
        .expect("Expected a last message");
    assert_eq!(last.content, "message 3");

    // Opening the thread marks everything from bob read
    let thread =
        MessageThread::open(backend, "alice", "bob").expect("Failed to open thread");
    thread.close();

    let conversations = index.refresh().expect("Failed to refresh");
    assert_eq!(conversations[0].unread_count, 0);
    assert_eq!(
        conversations[0]
            .last_message
            .as_ref()
            .expect("Expected a last message")
            .content,
        "message 3"
    );
}

#[test]
fn test_unread_count_ignores_own_messages() {
    let backend = test_backend();
    seed_users(&backend);
    ContactDirectory::new(backend.clone(), "alice")
        .ensure_contact("bob")
        .expect("Failed to add bob");

    backend
        .insert_message(MessageDraft::text("alice", "bob", "sent by me"))
        .expect("Failed to insert message");
    backend
        .insert_message(MessageDraft::text("bob", "alice", "sent by bob"))
        .expect("Failed to insert message");

    let conversations = ConversationIndex::new(backend, "alice")
        .refresh()
        .expect("Failed to refresh");

    assert_eq!(
        conversations[0].unread_count, 1,
        "Only contact -> me messages count as unread"
    );
}

#[test]
fn test_last_message_covers_both_directions() {
    let backend = test_backend();
    seed_users(&backend);
    ContactDirectory::new(backend.clone(), "alice")
        .ensure_contact("bob")
        .expect("Failed to add bob");

    backend
        .insert_message(MessageDraft::text("bob", "alice", "from bob"))
        .expect("Failed to insert message");
    backend
        .insert_message(MessageDraft::text("alice", "bob", "my reply"))
        .expect("Failed to insert message");

    let conversations = ConversationIndex::new(backend, "alice")
        .refresh()
        .expect("Failed to refresh");

    assert_eq!(
        conversations[0]
            .last_message
            .as_ref()
            .expect("Expected a last message")
            .content,
        "my reply"
    );
}

#[test]
fn test_counts_are_scoped_per_contact() {
    let backend = test_backend();
    seed_users(&backend);
    let directory = ContactDirectory::new(backend.clone(), "alice");
    directory.ensure_contact("bob").expect("Failed to add bob");
    directory
        .ensure_contact("carol")
        .expect("Failed to add carol");

    backend
        .insert_message(MessageDraft::text("bob", "alice", "from bob"))
        .expect("Failed to insert message");
    backend
        .insert_message(MessageDraft::text("carol", "alice", "from carol 1"))
        .expect("Failed to insert message");
    backend
        .insert_message(MessageDraft::text("carol", "alice", "from carol 2"))
        .expect("Failed to insert message");

    let mut conversations = ConversationIndex::new(backend, "alice")
        .refresh()
        .expect("Failed to refresh");
    conversations.sort_by(|a, b| a.contact.id.cmp(&b.contact.id));

    assert_eq!(conversations[0].contact.id, "bob");
    assert_eq!(conversations[0].unread_count, 1);
    assert_eq!(conversations[1].contact.id, "carol");
    assert_eq!(conversations[1].unread_count, 2);
}
