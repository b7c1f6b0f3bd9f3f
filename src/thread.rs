//! Message thread
//!
//! One open conversation between the current user and a contact: the
//! historical load, the live change-feed subscription layered on top of
//! it, read-receipt bookkeeping and the self-destruct display mapping.
//!
//! The history fetch and the live feed overlap, so a message inserted in
//! the open window can arrive through both paths; appends de-duplicate by
//! message ID. Closing the thread (or dropping it) cancels the
//! subscription so no detached callback keeps mutating a stale list.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::Result;
use crate::store::{Backend, ChangeEvent, DisplayMessage, EventFeed, Message};

/// An open conversation between the current user and one contact
pub struct MessageThread {
    backend: Arc<dyn Backend>,
    me: String,
    contact_id: String,
    messages: Vec<DisplayMessage>,
    seen_ids: HashSet<String>,
    feed: EventFeed,
}

impl MessageThread {
    /// Open the thread between `me` and `contact_id`.
    ///
    /// Subscribes to the change feed before fetching history so nothing
    /// inserted in between is lost, loads all messages between the pair
    /// ascending by `created_at`, then marks every unread message from
    /// the contact read. The read-marking is best-effort: a failure is
    /// logged and the unread flags persist until the next successful
    /// pass.
    pub fn open(
        backend: Arc<dyn Backend>,
        me: impl Into<String>,
        contact_id: impl Into<String>,
    ) -> Result<Self> {
        let me = me.into();
        let contact_id = contact_id.into();

        let feed = backend.subscribe();
        let history = backend.messages_between(&me, &contact_id)?;

        if let Err(e) = backend.mark_conversation_read(&contact_id, &me, Utc::now()) {
            warn!(
                "Failed to mark conversation {} -> {} read: {}",
                contact_id, me, e
            );
        }

        let mut thread = Self {
            backend,
            me,
            contact_id,
            messages: Vec::with_capacity(history.len()),
            seen_ids: HashSet::new(),
            feed,
        };
        for message in history {
            thread.append(message);
        }
        Ok(thread)
    }

    /// The contact this thread is with
    pub fn contact_id(&self) -> &str {
        &self.contact_id
    }

    /// Messages in `created_at` order
    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    /// Wait for the next feed event affecting this pair and apply it.
    ///
    /// Returns the message that was appended or updated, or `None` once
    /// the store side of the feed has closed. Events for other
    /// conversations are skipped.
    pub async fn next_event(&mut self) -> Option<DisplayMessage> {
        while let Some(event) = self.feed.recv().await {
            if let Some(changed) = self.apply(event) {
                return Some(changed);
            }
        }
        None
    }

    /// Apply every event already queued on the feed without waiting.
    ///
    /// Returns how many messages were appended or updated.
    pub fn drain_pending(&mut self) -> usize {
        let mut changed = 0;
        while let Some(event) = self.feed.try_recv() {
            if self.apply(event).is_some() {
                changed += 1;
            }
        }
        changed
    }

    /// Tear the thread down, cancelling the live subscription
    pub fn close(self) {
        self.feed.close();
    }

    fn apply(&mut self, event: ChangeEvent) -> Option<DisplayMessage> {
        match event {
            ChangeEvent::MessageInserted(message)
                if message.involves(&self.me, &self.contact_id) =>
            {
                if self.seen_ids.contains(&message.id) {
                    // The initial fetch and the live feed can both carry a
                    // row inserted during the open window.
                    debug!("Dropping duplicate delivery of message {}", message.id);
                    return None;
                }

                // Incoming messages are read the moment the thread shows
                // them. Messages sent by me from another client are
                // appended untouched.
                if message.receiver_id == self.me {
                    if let Err(e) = self.backend.mark_message_read(&message.id, Utc::now()) {
                        warn!("Failed to mark message {} read: {}", message.id, e);
                    }
                }

                Some(self.append(message))
            }
            ChangeEvent::MessageUpdated(message)
                if message.involves(&self.me, &self.contact_id) =>
            {
                // Read receipts arriving for a message already in the list
                let slot = self
                    .messages
                    .iter_mut()
                    .find(|existing| existing.message.id == message.id)?;
                *slot = DisplayMessage::from_message(message);
                Some(slot.clone())
            }
            _ => None,
        }
    }

    fn append(&mut self, message: Message) -> DisplayMessage {
        self.seen_ids.insert(message.id.clone());
        let display = DisplayMessage::from_message(message);
        self.messages.push(display.clone());
        display
    }
}
