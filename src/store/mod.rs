//! Data model and store boundary
//!
//! This module defines the rows the messaging core reads and writes, and
//! the boundary to the external row store that holds them:
//! - `profile` - user records and the presence policy derived from them
//! - `contact` - directed contact relations
//! - `message` - stored messages and their display mapping
//! - `backend` - row-store + change-feed trait and the event feed
//! - `sqlite` - SQLite-backed reference implementation of the backend

// Submodules
pub mod backend;
pub mod contact;
pub mod message;
pub mod profile;
pub mod sqlite;

// Re-export commonly used types
pub use backend::{Backend, ChangeEvent, EventFeed, FeedPublisher};
pub use contact::Contact;
pub use message::{DisplayMessage, Message, MessageDraft, MessageKind};
pub use profile::Profile;
pub use sqlite::SqliteBackend;
