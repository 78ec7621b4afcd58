//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::action::Action;
use crate::core::room::{RoomId, RoomMetadata};
use crate::core::state::App;
use crate::protocol::{ChatSession, SessionError};

/// A session that records every call instead of talking to a homeserver.
#[derive(Default)]
pub struct RecordingSession {
    pub calls: Mutex<Vec<String>>,
}

impl RecordingSession {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl ChatSession for RecordingSession {
    async fn send_message(&self, room: &RoomId, body: &str) -> Result<(), SessionError> {
        self.record(format!("send {room} {body}"));
        Ok(())
    }

    async fn send_typing(&self, room: &RoomId) -> Result<(), SessionError> {
        self.record(format!("typing {room}"));
        Ok(())
    }

    async fn join_room(
        &self,
        identifier: &str,
        server_hint: Option<&str>,
    ) -> Result<RoomId, SessionError> {
        self.record(format!("join {identifier} {}", server_hint.unwrap_or("-")));
        Ok(RoomId::new(identifier))
    }

    async fn leave_room(&self, room: &RoomId) -> Result<(), SessionError> {
        self.record(format!("leave {room}"));
        Ok(())
    }

    async fn update_room_info(&self, room: &RoomId) -> Result<(), SessionError> {
        self.record(format!("refresh {room}"));
        Ok(())
    }

    fn load_room_metadata(&self, _room: &RoomId) -> Option<RoomMetadata> {
        None
    }

    async fn clear_cached_state(&self) -> Result<(), SessionError> {
        self.record("clear".to_string());
        Ok(())
    }

    async fn persist_state(&self) -> Result<(), SessionError> {
        self.record("persist".to_string());
        Ok(())
    }
}

/// Creates a test App for a fixed user.
pub fn test_app() -> App {
    App::new("@tester:example.org")
}

/// A `RoomListChanged` action with no metadata.
pub fn room_list(ids: &[&str]) -> Action {
    Action::RoomListChanged {
        rooms: ids.iter().map(|id| RoomId::from(*id)).collect(),
        metadata: HashMap::new(),
    }
}
