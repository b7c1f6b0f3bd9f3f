//! Directed contact relations
//!
//! A contact row means "owner has added contact to their list". The
//! relation is one-directional: it grants no visibility the other way
//! unless the other side independently adds the owner.

use serde::{Deserialize, Serialize};

/// A directed contact relation in the `contacts` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// The user who added the contact
    pub owner_id: String,
    /// The user who was added
    pub contact_id: String,
}

impl Contact {
    /// Create a new contact relation
    pub fn new(owner_id: impl Into<String>, contact_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            contact_id: contact_id.into(),
        }
    }
}
