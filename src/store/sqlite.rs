//! SQLite-backed reference backend
//!
//! Production deployments run the core against the platform's managed row
//! store. This backend implements the same [`Backend`] contract over a
//! local SQLite database so the core can be exercised end to end in
//! tests, demos and offline development. Change events are published on
//! every mutation, mirroring the managed store's change feed.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::store::backend::{Backend, ChangeEvent, EventFeed, FeedPublisher};
use crate::store::{Contact, Message, MessageDraft, MessageKind, Profile};
use crate::{Error, Result};

/// SQLite implementation of the store boundary
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    feed: FeedPublisher,
    /// Last `created_at` handed out, in Unix milliseconds. Kept so that
    /// assigned timestamps are strictly increasing even when inserts land
    /// within the same millisecond.
    last_created_at: Mutex<i64>,
}

impl SqliteBackend {
    /// Create a backend with a database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::Store(format!("Failed to open database: {}", e)))?;
        Self::new_with_connection(conn)
    }

    /// Create an in-memory backend (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Store(format!("Failed to create in-memory database: {}", e)))?;
        Self::new_with_connection(conn)
    }

    fn new_with_connection(conn: Connection) -> Result<Self> {
        let backend = Self {
            conn: Mutex::new(conn),
            feed: FeedPublisher::new(),
            last_created_at: Mutex::new(0),
        };
        backend.init_schema()?;
        Ok(backend)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL,
                avatar_url TEXT,
                is_active INTEGER NOT NULL,
                last_active INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS contacts (
                owner_id TEXT NOT NULL,
                contact_id TEXT NOT NULL,
                PRIMARY KEY (owner_id, contact_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                sender_id TEXT NOT NULL,
                receiver_id TEXT NOT NULL,
                content TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                media_url TEXT,
                is_self_destruct INTEGER NOT NULL,
                destruct_after TEXT,
                read_at INTEGER
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_pair
             ON messages(sender_id, receiver_id, created_at)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_profiles_email ON profiles(email)",
            [],
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Store("Database mutex poisoned".to_string()))
    }

    /// Assign the next creation timestamp, strictly after the previous one
    fn next_created_at(&self) -> Result<DateTime<Utc>> {
        let mut last = self
            .last_created_at
            .lock()
            .map_err(|_| Error::Store("Timestamp mutex poisoned".to_string()))?;
        let next = Utc::now().timestamp_millis().max(*last + 1);
        *last = next;
        Ok(ms_to_datetime(next))
    }

    fn load_message(conn: &Connection, id: &str) -> Result<Option<Message>> {
        let message = conn
            .query_row(
                "SELECT id, sender_id, receiver_id, content, kind, created_at,
                        media_url, is_self_destruct, destruct_after, read_at
                 FROM messages WHERE id = ?1",
                params![id],
                row_to_message,
            )
            .optional()?;
        Ok(message)
    }

    fn load_profile(conn: &Connection, id: &str) -> Result<Option<Profile>> {
        let profile = conn
            .query_row(
                "SELECT id, first_name, last_name, email, avatar_url, is_active, last_active
                 FROM profiles WHERE id = ?1",
                params![id],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// Inject a raw change event, bypassing a mutation. Used by tests to
    /// simulate feed redelivery.
    #[cfg(test)]
    pub(crate) fn publish_event(&self, event: ChangeEvent) {
        self.feed.publish(event);
    }

    /// Number of feeds currently attached
    #[cfg(test)]
    pub(crate) fn feed_subscriber_count(&self) -> usize {
        self.feed.subscriber_count()
    }
}

impl Backend for SqliteBackend {
    fn profile(&self, id: &str) -> Result<Option<Profile>> {
        let conn = self.conn()?;
        Self::load_profile(&conn, id)
    }

    fn profile_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                "SELECT id, first_name, last_name, email, avatar_url, is_active, last_active
                 FROM profiles WHERE email = ?1 LIMIT 1",
                params![email],
                row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        {
            let conn = self.conn()?;
            conn.execute(
                "INSERT OR REPLACE INTO profiles
                 (id, first_name, last_name, email, avatar_url, is_active, last_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    &profile.id,
                    &profile.first_name,
                    &profile.last_name,
                    &profile.email,
                    &profile.avatar_url,
                    profile.is_active as i32,
                    profile.last_active.timestamp_millis(),
                ],
            )?;
        }
        self.feed.publish(ChangeEvent::ProfileUpdated(profile.clone()));
        Ok(())
    }

    fn touch_presence(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let profile = {
            let conn = self.conn()?;
            let changed = conn.execute(
                "UPDATE profiles SET is_active = 1, last_active = ?1 WHERE id = ?2",
                params![at.timestamp_millis(), id],
            )?;
            if changed == 0 {
                return Err(Error::NotFound(format!("No profile with id {}", id)));
            }
            Self::load_profile(&conn, id)?
        };
        if let Some(profile) = profile {
            self.feed.publish(ChangeEvent::ProfileUpdated(profile));
        }
        Ok(())
    }

    fn contact_ids(&self, owner_id: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT contact_id FROM contacts WHERE owner_id = ?1")?;
        let ids = stmt
            .query_map(params![owner_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn add_contact(&self, contact: &Contact) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO contacts (owner_id, contact_id) VALUES (?1, ?2)",
            params![&contact.owner_id, &contact.contact_id],
        )?;
        Ok(inserted > 0)
    }

    fn insert_message(&self, draft: MessageDraft) -> Result<Message> {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            sender_id: draft.sender_id,
            receiver_id: draft.receiver_id,
            content: draft.content,
            kind: draft.kind,
            created_at: self.next_created_at()?,
            media_url: draft.media_url,
            is_self_destruct: draft.is_self_destruct,
            destruct_after: draft.destruct_after,
            read_at: None,
        };
        {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO messages
                 (id, sender_id, receiver_id, content, kind, created_at,
                  media_url, is_self_destruct, destruct_after, read_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL)",
                params![
                    &message.id,
                    &message.sender_id,
                    &message.receiver_id,
                    &message.content,
                    message.kind.as_str(),
                    message.created_at.timestamp_millis(),
                    &message.media_url,
                    message.is_self_destruct as i32,
                    &message.destruct_after,
                ],
            )?;
        }
        self.feed
            .publish(ChangeEvent::MessageInserted(message.clone()));
        Ok(message)
    }

    fn messages_between(&self, a: &str, b: &str) -> Result<Vec<Message>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, sender_id, receiver_id, content, kind, created_at,
                    media_url, is_self_destruct, destruct_after, read_at
             FROM messages
             WHERE (sender_id = ?1 AND receiver_id = ?2)
                OR (sender_id = ?2 AND receiver_id = ?1)
             ORDER BY created_at ASC",
        )?;
        let messages = stmt
            .query_map(params![a, b], row_to_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    fn last_message_between(&self, a: &str, b: &str) -> Result<Option<Message>> {
        let conn = self.conn()?;
        let message = conn
            .query_row(
                "SELECT id, sender_id, receiver_id, content, kind, created_at,
                        media_url, is_self_destruct, destruct_after, read_at
                 FROM messages
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)
                 ORDER BY created_at DESC LIMIT 1",
                params![a, b],
                row_to_message,
            )
            .optional()?;
        Ok(message)
    }

    fn unread_count(&self, sender_id: &str, receiver_id: &str) -> Result<u64> {
        let conn = self.conn()?;
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM messages
             WHERE sender_id = ?1 AND receiver_id = ?2 AND read_at IS NULL",
            params![sender_id, receiver_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn mark_conversation_read(
        &self,
        sender_id: &str,
        receiver_id: &str,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let updated = {
            let conn = self.conn()?;
            let ids: Vec<String> = {
                let mut stmt = conn.prepare(
                    "SELECT id FROM messages
                     WHERE sender_id = ?1 AND receiver_id = ?2 AND read_at IS NULL",
                )?;
                stmt.query_map(params![sender_id, receiver_id], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            };
            let mut rows = Vec::with_capacity(ids.len());
            for id in ids {
                conn.execute(
                    "UPDATE messages SET read_at = ?1 WHERE id = ?2 AND read_at IS NULL",
                    params![at.timestamp_millis(), id],
                )?;
                if let Some(message) = Self::load_message(&conn, &id)? {
                    rows.push(message);
                }
            }
            rows
        };
        let count = updated.len() as u64;
        for message in updated {
            self.feed.publish(ChangeEvent::MessageUpdated(message));
        }
        Ok(count)
    }

    fn mark_message_read(&self, message_id: &str, at: DateTime<Utc>) -> Result<()> {
        let updated = {
            let conn = self.conn()?;
            let changed = conn.execute(
                "UPDATE messages SET read_at = ?1 WHERE id = ?2 AND read_at IS NULL",
                params![at.timestamp_millis(), message_id],
            )?;
            if changed == 0 {
                // Already read or unknown; receipts only move forward.
                None
            } else {
                Self::load_message(&conn, message_id)?
            }
        };
        if let Some(message) = updated {
            self.feed.publish(ChangeEvent::MessageUpdated(message));
        }
        Ok(())
    }

    fn subscribe(&self) -> EventFeed {
        self.feed.subscribe()
    }
}

fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let kind: String = row.get(4)?;
    let created_at: i64 = row.get(5)?;
    let is_self_destruct: i32 = row.get(7)?;
    let read_at: Option<i64> = row.get(9)?;

    Ok(Message {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        kind: MessageKind::parse(&kind),
        created_at: ms_to_datetime(created_at),
        media_url: row.get(6)?,
        is_self_destruct: is_self_destruct != 0,
        destruct_after: row.get(8)?,
        read_at: read_at.map(ms_to_datetime),
    })
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    let is_active: i32 = row.get(5)?;
    let last_active: i64 = row.get(6)?;

    Ok(Profile {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        avatar_url: row.get(4)?,
        is_active: is_active != 0,
        last_active: ms_to_datetime(last_active),
    })
}
