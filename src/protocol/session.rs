use std::fmt;

use async_trait::async_trait;

use crate::core::room::{RoomId, RoomMetadata};

/// Errors that can occur while talking to the homeserver.
#[derive(Debug)]
pub enum SessionError {
    /// Misconfigured (bad homeserver URL, no credentials). Not retryable.
    Config(String),
    /// Network-level failure (timeout, DNS, connection refused). Retryable.
    Network(String),
    /// Homeserver returned an error response.
    Api {
        status: u16,
        errcode: String,
        message: String,
    },
    /// Failed to parse the homeserver's response.
    Parse(String),
    /// Reading or writing the session store failed.
    Io(std::io::Error),
    /// The UI dropped its end of the action channel.
    ChannelClosed,
}

impl SessionError {
    /// Whether the sync loop should back off and try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Network(_) => true,
            SessionError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Config(msg) => write!(f, "config error: {msg}"),
            SessionError::Network(msg) => write!(f, "network error: {msg}"),
            SessionError::Api {
                status,
                errcode,
                message,
            } => write!(f, "{errcode} (HTTP {status}): {message}"),
            SessionError::Parse(msg) => write!(f, "parse error: {msg}"),
            SessionError::Io(e) => write!(f, "session store error: {e}"),
            SessionError::ChannelClosed => write!(f, "channel closed"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::Io(e)
    }
}

/// The chat-protocol session as seen by the UI.
///
/// Every async method is fire-and-forget from the UI's point of view: the UI
/// spawns the call and only hears back through `Action::SessionError`.
#[async_trait]
pub trait ChatSession: Send + Sync {
    async fn send_message(&self, room: &RoomId, body: &str) -> Result<(), SessionError>;

    /// Tell the room that the user is composing.
    async fn send_typing(&self, room: &RoomId) -> Result<(), SessionError>;

    async fn join_room(
        &self,
        identifier: &str,
        server_hint: Option<&str>,
    ) -> Result<RoomId, SessionError>;

    async fn leave_room(&self, room: &RoomId) -> Result<(), SessionError>;

    /// Re-fetch name, alias and topic. Changes arrive later as
    /// `Action::RoomMetadataChanged`.
    async fn update_room_info(&self, room: &RoomId) -> Result<(), SessionError>;

    /// Cached metadata for a room, if the session knows it.
    fn load_room_metadata(&self, room: &RoomId) -> Option<RoomMetadata>;

    /// Forget cached rooms, sync position and filter.
    async fn clear_cached_state(&self) -> Result<(), SessionError>;

    async fn persist_state(&self) -> Result<(), SessionError>;
}
