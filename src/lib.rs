//! Huddle - messaging and presence core
//!
//! This library implements the direct-messaging and presence subsystem of a
//! creator community platform: the contact directory, the derived
//! conversation list, per-conversation message threads with live updates and
//! read receipts, and the presence heartbeat. Persistence and change fan-out
//! are delegated to a row store behind the [`store::Backend`] trait; a
//! SQLite-backed implementation is included for tests, demos and offline use.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conversations;
pub mod directory;
pub mod presence;
pub mod store;
pub mod thread;

#[cfg(test)]
mod tests;

/// Result type alias for huddle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for huddle operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Store operation error
    #[error("Store error: {0}")]
    Store(String),

    /// A row lookup that found nothing (unknown user, unmatched email)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Attempt to add oneself as a contact
    #[error("Cannot add yourself as a contact")]
    SelfContact,

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize the huddle library with logging
pub fn init() {
    tracing_subscriber::fmt::init();
}
