//! Stored messages and display mapping
//!
//! A message row is immutable once inserted except for `read_at`, which
//! the receiver's client sets exactly once. A "conversation" is never
//! stored; it is derived from the set of messages between two users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message content type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text message
    #[default]
    Text,
    /// Image attachment
    Image,
    /// Voice recording
    Voice,
    /// Video attachment
    Video,
}

impl MessageKind {
    /// Column representation used by the store
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Voice => "voice",
            MessageKind::Video => "video",
        }
    }

    /// Parse a stored kind, falling back to text for anything unknown
    pub fn parse(value: &str) -> Self {
        match value {
            "image" => MessageKind::Image,
            "voice" => MessageKind::Voice,
            "video" => MessageKind::Video,
            _ => MessageKind::Text,
        }
    }
}

/// A stored message row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message ID (assigned by the store)
    pub id: String,
    /// Sender user ID
    pub sender_id: String,
    /// Receiver user ID
    pub receiver_id: String,
    /// Message body
    pub content: String,
    /// Content type, text when absent in the source row
    #[serde(default)]
    pub kind: MessageKind,
    /// Store-assigned creation timestamp; defines thread order
    pub created_at: DateTime<Utc>,
    /// Attachment reference for non-text kinds
    pub media_url: Option<String>,
    /// Whether the message carries ephemeral-display metadata
    #[serde(default)]
    pub is_self_destruct: bool,
    /// Duration string such as "10 minutes"; advisory display state only
    pub destruct_after: Option<String>,
    /// When the receiver marked the message read; null until then
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Whether the receiver has marked this message read
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// Whether this message belongs to the conversation between `a` and
    /// `b`, in either direction
    pub fn involves(&self, a: &str, b: &str) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

/// An outgoing message before the store has accepted it
///
/// The store assigns `id` and `created_at` on insert; everything else is
/// supplied by the composer.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    /// Sender user ID
    pub sender_id: String,
    /// Receiver user ID
    pub receiver_id: String,
    /// Message body
    pub content: String,
    /// Content type
    pub kind: MessageKind,
    /// Attachment reference for non-text kinds
    pub media_url: Option<String>,
    /// Whether the message should display as ephemeral
    pub is_self_destruct: bool,
    /// Ephemeral-display duration string, e.g. "10 minutes"
    pub destruct_after: Option<String>,
}

impl MessageDraft {
    /// Create a plain text draft
    pub fn text(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            content: content.into(),
            kind: MessageKind::Text,
            media_url: None,
            is_self_destruct: false,
            destruct_after: None,
        }
    }

    /// Create a draft carrying a media attachment
    pub fn media(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        kind: MessageKind,
        media_url: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            content: String::new(),
            kind,
            media_url: Some(media_url.into()),
            is_self_destruct: false,
            destruct_after: None,
        }
    }

    /// Mark the draft as self-destructing after the given duration string
    pub fn with_self_destruct(mut self, after: impl Into<String>) -> Self {
        self.is_self_destruct = true;
        self.destruct_after = Some(after.into());
        self
    }
}

/// A message as the conversation view renders it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayMessage {
    /// The underlying stored row
    pub message: Message,
    /// Whether the receiver has read the message
    pub read: bool,
    /// Minutes until ephemeral display expiry, if the message
    /// self-destructs and its duration string parses
    pub self_destruct_time: Option<u32>,
}

impl DisplayMessage {
    /// Map a stored row to its display form
    pub fn from_message(message: Message) -> Self {
        let read = message.is_read();
        let self_destruct_time = if message.is_self_destruct {
            message
                .destruct_after
                .as_deref()
                .and_then(parse_leading_int)
        } else {
            None
        };
        Self {
            message,
            read,
            self_destruct_time,
        }
    }
}

/// Parse the leading integer of a duration string like "10 minutes".
///
/// Best-effort: a missing or malformed numeral yields `None` rather than
/// an error, since the value is advisory display state.
fn parse_leading_int(value: &str) -> Option<u32> {
    let digits: String = value
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_message(is_self_destruct: bool, destruct_after: Option<&str>) -> Message {
        Message {
            id: "m1".to_string(),
            sender_id: "alice".to_string(),
            receiver_id: "bob".to_string(),
            content: "hello".to_string(),
            kind: MessageKind::Text,
            created_at: Utc::now(),
            media_url: None,
            is_self_destruct,
            destruct_after: destruct_after.map(str::to_string),
            read_at: None,
        }
    }

    #[test]
    fn test_self_destruct_duration_parses() {
        let display = DisplayMessage::from_message(stored_message(true, Some("10 minutes")));
        assert_eq!(display.self_destruct_time, Some(10));
    }

    #[test]
    fn test_self_destruct_without_duration() {
        let display = DisplayMessage::from_message(stored_message(true, None));
        assert_eq!(display.self_destruct_time, None);
    }

    #[test]
    fn test_malformed_duration_yields_none() {
        let display = DisplayMessage::from_message(stored_message(true, Some("soon")));
        assert_eq!(display.self_destruct_time, None);
    }

    #[test]
    fn test_duration_ignored_without_flag() {
        let display = DisplayMessage::from_message(stored_message(false, Some("10 minutes")));
        assert_eq!(display.self_destruct_time, None);
    }

    #[test]
    fn test_read_flag_follows_read_at() {
        let mut message = stored_message(false, None);
        assert!(!DisplayMessage::from_message(message.clone()).read);

        message.read_at = Some(Utc::now());
        assert!(DisplayMessage::from_message(message).read);
    }

    #[test]
    fn test_involves_is_direction_agnostic() {
        let message = stored_message(false, None);
        assert!(message.involves("alice", "bob"));
        assert!(message.involves("bob", "alice"));
        assert!(!message.involves("alice", "carol"));
    }

    #[test]
    fn test_kind_defaults_to_text_when_absent() {
        let json = r#"{
            "id": "m1",
            "sender_id": "alice",
            "receiver_id": "bob",
            "content": "hi",
            "created_at": "2024-01-01T00:00:00Z",
            "media_url": null,
            "destruct_after": null,
            "read_at": null
        }"#;
        let message: Message = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(message.kind, MessageKind::Text);
        assert!(!message.is_self_destruct);
    }

    #[test]
    fn test_kind_parse_round_trip() {
        for kind in [
            MessageKind::Text,
            MessageKind::Image,
            MessageKind::Voice,
            MessageKind::Video,
        ] {
            assert_eq!(MessageKind::parse(kind.as_str()), kind);
        }
        assert_eq!(MessageKind::parse("sticker"), MessageKind::Text);
    }
}
