//! Contact directory and contact resolution
//!
//! Resolves a user's contact list to profile summaries and turns a
//! looked-up user (by ID from directory search, or by exact email) into a
//! contact relation. Adds are idempotent: a duplicate insert resolves to
//! the existing relation rather than failing.

use std::sync::Arc;

use tracing::info;

use crate::store::{Backend, Contact, Profile};
use crate::{Error, Result};

/// Directory of the contacts one user has added
pub struct ContactDirectory {
    backend: Arc<dyn Backend>,
    owner_id: String,
}

impl ContactDirectory {
    /// Create a directory for `owner_id`
    pub fn new(backend: Arc<dyn Backend>, owner_id: impl Into<String>) -> Self {
        Self {
            backend,
            owner_id: owner_id.into(),
        }
    }

    /// The user whose contact list this directory resolves
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Resolve the owner's contact list to profiles.
    ///
    /// The relation is unique per (owner, contact), so the result carries
    /// no duplicates. A contact whose profile row has disappeared is
    /// skipped rather than failing the whole list.
    pub fn contacts(&self) -> Result<Vec<Profile>> {
        let ids = self.backend.contact_ids(&self.owner_id)?;
        let mut profiles = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(profile) = self.backend.profile(&id)? {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }

    /// Ensure a one-directional contact relation to `target_id` exists
    /// and return the contact's profile.
    ///
    /// Idempotent: if the relation already exists no duplicate is created
    /// and the existing contact is returned. Adding oneself is rejected
    /// without side effects.
    ///
    /// # Errors
    /// * [`Error::SelfContact`] when `target_id` is the owner
    /// * [`Error::NotFound`] when no such user exists
    pub fn ensure_contact(&self, target_id: &str) -> Result<Profile> {
        if target_id == self.owner_id {
            return Err(Error::SelfContact);
        }

        let profile = self
            .backend
            .profile(target_id)?
            .ok_or_else(|| Error::NotFound(format!("No user with id {}", target_id)))?;

        let created = self
            .backend
            .add_contact(&Contact::new(self.owner_id.clone(), target_id))?;
        if created {
            info!("Added contact {} for {}", target_id, self.owner_id);
        }

        Ok(profile)
    }

    /// Look a user up by exact email match and add them as a contact.
    ///
    /// No row is written when the email matches nobody.
    ///
    /// # Errors
    /// * [`Error::NotFound`] when the email matches no user
    /// * [`Error::SelfContact`] when the email is the owner's own
    pub fn ensure_contact_by_email(&self, email: &str) -> Result<Profile> {
        let profile = self
            .backend
            .profile_by_email(email)?
            .ok_or_else(|| Error::NotFound(format!("No user with email {}", email)))?;
        self.ensure_contact(&profile.id)
    }
}
