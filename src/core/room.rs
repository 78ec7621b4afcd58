//! # Rooms
//!
//! Identifier, metadata, and per-room view state.
//!
//! A `RoomViewState` is created once, the first time its room shows up in a
//! room list, and lives for the rest of the process. Its message log only
//! ever grows.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, session-stable room identifier (e.g. `!abc:example.org`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Name and topic information for a room, as known by the protocol session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMetadata {
    /// Explicit room name (`m.room.name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Canonical alias (`m.room.canonical_alias`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_alias: Option<String>,
    /// Topic (`m.room.topic`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl RoomMetadata {
    /// Explicit name, else canonical alias, else the raw identifier.
    pub fn display_name(&self, id: &RoomId) -> String {
        non_empty(&self.name)
            .or_else(|| non_empty(&self.canonical_alias))
            .unwrap_or(id.as_str())
            .to_string()
    }

    pub fn topic(&self) -> String {
        non_empty(&self.topic).unwrap_or_default().to_string()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// One line of a room's message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLine {
    pub sender: String,
    pub body: String,
}

/// Accumulated visual state for a single room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomViewState {
    pub display_name: String,
    pub topic: String,
    messages: Vec<MessageLine>,
    /// `None` until the first typing update arrives.
    typing: Option<Vec<String>>,
}

impl RoomViewState {
    pub fn new(id: &RoomId, metadata: Option<&RoomMetadata>) -> Self {
        let (display_name, topic) = match metadata {
            Some(meta) => (meta.display_name(id), meta.topic()),
            None => (id.to_string(), String::new()),
        };
        Self {
            display_name,
            topic,
            messages: Vec::new(),
            typing: None,
        }
    }

    pub fn messages(&self) -> &[MessageLine] {
        &self.messages
    }

    pub fn push_message(&mut self, sender: impl Into<String>, body: impl Into<String>) {
        self.messages.push(MessageLine {
            sender: sender.into(),
            body: body.into(),
        });
    }

    pub fn typing_users(&self) -> &[String] {
        self.typing.as_deref().unwrap_or_default()
    }

    pub fn set_typing(&mut self, users: Vec<String>) {
        self.typing = Some(users);
    }

    /// Text for the one-line status under the room log.
    pub fn status_text(&self) -> String {
        match &self.typing {
            None => "Waiting for status data...".to_string(),
            Some(users) if users.is_empty() => String::new(),
            Some(users) => format!("Typing: {}", users.join(", ")),
        }
    }

    /// Recompute name and topic. The message log is left alone.
    pub fn apply_metadata(&mut self, id: &RoomId, metadata: &RoomMetadata) {
        self.display_name = metadata.display_name(id);
        self.topic = metadata.topic();
    }
}
