//! Conversation index
//!
//! Derives the chat list for one user: for each contact, the most recent
//! message in either direction and the count of unread messages from that
//! contact. Conversations are never persisted; the index recomputes the
//! full list on every refresh (one pair of queries per contact, which is
//! fine at contact-list scale). Callers re-run it when the contact list
//! changes or a new message involving the user is observed.

use std::sync::Arc;

use serde::Serialize;

use crate::Result;
use crate::directory::ContactDirectory;
use crate::store::{Backend, Message, Profile};

/// One chat-list entry, derived and never stored
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    /// The contact this conversation is with
    pub contact: Profile,
    /// Most recent message in either direction, if any
    pub last_message: Option<Message>,
    /// Messages from the contact not yet marked read
    pub unread_count: u64,
}

/// Assembles the conversation list for one user
pub struct ConversationIndex {
    backend: Arc<dyn Backend>,
    directory: ContactDirectory,
    owner_id: String,
}

impl ConversationIndex {
    /// Create an index for `owner_id`
    pub fn new(backend: Arc<dyn Backend>, owner_id: impl Into<String>) -> Self {
        let owner_id = owner_id.into();
        let directory = ContactDirectory::new(backend.clone(), owner_id.clone());
        Self {
            backend,
            directory,
            owner_id,
        }
    }

    /// Recompute the full conversation list.
    ///
    /// Ordering follows the contact list; sorting (by recency, unread
    /// first, ...) is left to the presentation layer.
    pub fn refresh(&self) -> Result<Vec<Conversation>> {
        let contacts = self.directory.contacts()?;
        let mut conversations = Vec::with_capacity(contacts.len());
        for contact in contacts {
            let last_message = self
                .backend
                .last_message_between(&self.owner_id, &contact.id)?;
            let unread_count = self.backend.unread_count(&contact.id, &self.owner_id)?;
            conversations.push(Conversation {
                contact,
                last_message,
                unread_count,
            });
        }
        Ok(conversations)
    }
}
