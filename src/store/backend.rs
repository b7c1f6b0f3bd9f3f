//! Row-store and change-feed boundary
//!
//! The platform's managed row store is an external collaborator. This
//! trait captures exactly what the messaging core consumes from it: typed
//! queries and mutations over the `profiles`, `contacts` and `messages`
//! tables, and a push subscription to row-change events. Every mutation
//! is a single-row update assumed atomic at the store level; no
//! transactional grouping is required.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::warn;

use crate::Result;
use crate::store::{Contact, Message, MessageDraft, Profile};

/// Buffered events per subscriber before the feed starts dropping
const FEED_CAPACITY: usize = 256;

/// A row-change notification pushed by the store
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// A new message row was inserted
    MessageInserted(Message),
    /// An existing message row was updated (read receipt)
    MessageUpdated(Message),
    /// A profile row was inserted or updated (presence, profile edits)
    ProfileUpdated(Profile),
}

/// Store boundary the messaging core runs against
///
/// Implementations must publish a [`ChangeEvent`] for every mutation so
/// that open threads and other subscribers observe new rows without
/// polling.
pub trait Backend: Send + Sync {
    /// Load one profile by ID
    fn profile(&self, id: &str) -> Result<Option<Profile>>;

    /// Load one profile by exact email match
    fn profile_by_email(&self, email: &str) -> Result<Option<Profile>>;

    /// Insert or replace a profile row
    fn upsert_profile(&self, profile: &Profile) -> Result<()>;

    /// Write `{last_active: at, is_active: true}` to one profile row.
    ///
    /// Multiple uncoordinated writers are expected; writes carry the same
    /// semantic value, so last-writer-wins is acceptable.
    fn touch_presence(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

    /// IDs of every user `owner_id` has added, without duplicates
    fn contact_ids(&self, owner_id: &str) -> Result<Vec<String>>;

    /// Insert the directed relation if it does not exist.
    ///
    /// Returns `false` when the relation already existed; a duplicate add
    /// is not an error.
    fn add_contact(&self, contact: &Contact) -> Result<bool>;

    /// Persist a draft, assigning its ID and creation timestamp.
    ///
    /// Assigned timestamps are strictly increasing, so `created_at` is a
    /// total order over a conversation.
    fn insert_message(&self, draft: MessageDraft) -> Result<Message>;

    /// All messages between `a` and `b` in either direction, ascending by
    /// `created_at`
    fn messages_between(&self, a: &str, b: &str) -> Result<Vec<Message>>;

    /// The most recent message between `a` and `b`, if any
    fn last_message_between(&self, a: &str, b: &str) -> Result<Option<Message>>;

    /// Count of unread messages sent by `sender_id` to `receiver_id`
    fn unread_count(&self, sender_id: &str, receiver_id: &str) -> Result<u64>;

    /// Set `read_at = at` on every unread message from `sender_id` to
    /// `receiver_id`. Rows already read are never touched, so a receipt
    /// can only move forward. Returns the number of rows updated.
    fn mark_conversation_read(
        &self,
        sender_id: &str,
        receiver_id: &str,
        at: DateTime<Utc>,
    ) -> Result<u64>;

    /// Set `read_at = at` on a single message if it is still unread
    fn mark_message_read(&self, message_id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Subscribe to row-change events.
    ///
    /// The feed stays live until dropped or [`EventFeed::close`]d; callers
    /// switching conversations must tear their feed down or a detached
    /// callback keeps consuming events.
    fn subscribe(&self) -> EventFeed;
}

/// A cancellable subscription to store change events
#[derive(Debug)]
pub struct EventFeed {
    rx: broadcast::Receiver<ChangeEvent>,
}

impl EventFeed {
    pub(crate) fn new(rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next change event.
    ///
    /// Returns `None` once the store side of the feed is gone. A slow
    /// subscriber that lagged skips the overwritten events and keeps
    /// going; the skip is logged because the caller may want a full
    /// refresh to recover them.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Change feed lagged, {} events dropped", missed);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Drain one already-queued event without waiting
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!("Change feed lagged, {} events dropped", missed);
                }
                Err(_) => return None,
            }
        }
    }

    /// Detach the feed.
    ///
    /// Dropping has the same effect; this method spells out the teardown
    /// contract invoked on conversation switch or view unmount.
    pub fn close(self) {}
}

/// Sender half used by backend implementations to publish change events
#[derive(Debug, Clone)]
pub struct FeedPublisher {
    tx: broadcast::Sender<ChangeEvent>,
}

impl FeedPublisher {
    /// Create a publisher with no subscribers yet
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Open a new feed attached to this publisher
    pub fn subscribe(&self) -> EventFeed {
        EventFeed::new(self.tx.subscribe())
    }

    /// Publish an event to all live feeds. Having no subscribers is not
    /// an error; the event is simply dropped.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of feeds currently attached
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for FeedPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MessageKind;

    fn sample_message() -> Message {
        Message {
            id: "m1".to_string(),
            sender_id: "alice".to_string(),
            receiver_id: "bob".to_string(),
            content: "hi".to_string(),
            kind: MessageKind::Text,
            created_at: Utc::now(),
            media_url: None,
            is_self_destruct: false,
            destruct_after: None,
            read_at: None,
        }
    }

    #[test]
    fn test_publish_reaches_subscriber() {
        let publisher = FeedPublisher::new();
        let mut feed = publisher.subscribe();

        publisher.publish(ChangeEvent::MessageInserted(sample_message()));

        match feed.try_recv() {
            Some(ChangeEvent::MessageInserted(message)) => assert_eq!(message.id, "m1"),
            other => panic!("Expected MessageInserted, got {:?}", other),
        }
        assert!(feed.try_recv().is_none());
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let publisher = FeedPublisher::new();
        publisher.publish(ChangeEvent::MessageInserted(sample_message()));
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn test_close_detaches_feed() {
        let publisher = FeedPublisher::new();
        let feed = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 1);

        feed.close();
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_publisher_dropped() {
        let publisher = FeedPublisher::new();
        let mut feed = publisher.subscribe();
        drop(publisher);

        assert!(feed.recv().await.is_none());
    }
}
