//! End-to-end demo of the messaging core against the SQLite backend.
//!
//! Seeds two users, adds a contact by email, runs a presence heartbeat,
//! exchanges a few messages through an open thread and prints the derived
//! conversation list.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use huddle::conversations::ConversationIndex;
use huddle::directory::ContactDirectory;
use huddle::presence::PresenceHeartbeat;
use huddle::store::{Backend, MessageDraft, Profile, SqliteBackend};
use huddle::thread::MessageThread;

#[tokio::main]
async fn main() -> Result<()> {
    huddle::init();

    let backend: Arc<dyn Backend> = Arc::new(SqliteBackend::new_in_memory()?);

    backend.upsert_profile(&Profile::new("alice", "Alice", "Moreau", "alice@example.com"))?;
    backend.upsert_profile(&Profile::new("bob", "Bob", "Tanaka", "bob@example.com"))?;

    let heartbeat =
        PresenceHeartbeat::start_with_interval(backend.clone(), "alice", Duration::from_secs(5));

    let directory = ContactDirectory::new(backend.clone(), "alice");
    let bob = directory.ensure_contact_by_email("bob@example.com")?;
    println!("Added contact: {}", bob.display_name());

    let mut thread = MessageThread::open(backend.clone(), "alice", "bob")?;

    backend.insert_message(MessageDraft::text("bob", "alice", "Hey Alice!"))?;
    backend.insert_message(
        MessageDraft::text("bob", "alice", "This one disappears").with_self_destruct("10 minutes"),
    )?;

    while thread.messages().len() < 2 {
        if thread.next_event().await.is_none() {
            break;
        }
    }

    for msg in thread.messages() {
        println!(
            "[{}] {}: {} (read: {}, self-destructs in: {:?} min)",
            msg.message.created_at,
            msg.message.sender_id,
            msg.message.content,
            msg.read,
            msg.self_destruct_time,
        );
    }

    let index = ConversationIndex::new(backend.clone(), "alice");
    let conversations = index.refresh()?;
    println!("{}", serde_json::to_string_pretty(&conversations)?);

    thread.close();
    heartbeat.stop();
    Ok(())
}
