//! # Actions
//!
//! Everything that can happen in mxchat becomes an `Action`.
//! A message arrives from the homeserver? That's `Action::Message`.
//! User presses Ctrl+Down? That's `Action::NextRoom`.
//!
//! The `update()` function applies an action to the `App` and returns an
//! `Effect` describing the I/O the caller should perform. No I/O happens here.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```
//!
//! Protocol tasks never touch `App` directly: they send actions over a
//! channel, and the UI loop feeds them through `update()` one at a time.

use std::collections::HashMap;

use log::{debug, info};

use crate::core::command;
use crate::core::room::{RoomId, RoomMetadata};
use crate::core::state::App;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The joined room list was refreshed. `metadata` answers name/topic
    /// lookups for rooms that don't have a view yet.
    RoomListChanged {
        rooms: Vec<RoomId>,
        metadata: HashMap<RoomId, RoomMetadata>,
    },
    /// Name, alias or topic of a room changed.
    RoomMetadataChanged {
        room: RoomId,
        metadata: RoomMetadata,
    },
    Message {
        room: RoomId,
        sender: String,
        body: String,
    },
    Typing {
        room: RoomId,
        users: Vec<String>,
    },
    /// Input line was edited (any keystroke, not just submit)
    InputChanged,
    /// User pressed Enter on a non-empty input line
    InputSubmitted(String),
    NextRoom,
    PrevRoom,
    SelectRoom(usize),
    /// A protocol request failed
    SessionError(String),
    /// A sync round succeeded, either the first one or the first after a failure
    Synced,
    Quit,
}

/// Work the protocol session should do on behalf of the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRequest {
    SendMessage { room: RoomId, body: String },
    SendTyping { room: RoomId },
    Join {
        identifier: String,
        server_hint: Option<String>,
    },
    Leave { room: RoomId },
}

/// What the caller must do after `update()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Render,
    Request(SessionRequest),
    /// Best-effort metadata refresh for each listed room
    RefreshRooms(Vec<RoomId>),
    Quit,
    /// Drop cached rooms and sync position, persist that, then quit
    ClearCacheAndQuit,
}

pub fn update(app: &mut App, action: Action) -> Effect {
    match action {
        Action::RoomListChanged { rooms, metadata } => {
            info!("Room list changed: {} rooms", rooms.len());
            app.registry
                .set_rooms(rooms.clone(), |id| metadata.get(id).cloned());
            // Rooms that were left and rejoined still have a view from before
            for (room, meta) in &metadata {
                app.registry.update_metadata(room, meta);
            }
            Effect::RefreshRooms(rooms)
        }
        Action::RoomMetadataChanged { room, metadata } => {
            if app.registry.update_metadata(&room, &metadata) {
                Effect::Render
            } else {
                Effect::None
            }
        }
        Action::Message { room, sender, body } => {
            if app.registry.append_message(&room, &sender, &body) {
                Effect::Render
            } else {
                Effect::None
            }
        }
        Action::Typing { room, users } => {
            if app.registry.set_typing(&room, users) {
                Effect::Render
            } else {
                Effect::None
            }
        }
        Action::InputChanged => match app.registry.current() {
            Some(room) => Effect::Request(SessionRequest::SendTyping { room: room.clone() }),
            None => Effect::None,
        },
        Action::InputSubmitted(text) => command::route(&mut app.registry, &text),
        Action::NextRoom => {
            app.registry.switch_by(1);
            Effect::Render
        }
        Action::PrevRoom => {
            app.registry.switch_by(-1);
            Effect::Render
        }
        Action::SelectRoom(index) => {
            app.registry.switch_to(index as isize);
            Effect::Render
        }
        Action::SessionError(message) => {
            debug!("Session error reported: {}", message);
            app.status_message = message;
            Effect::Render
        }
        Action::Synced => {
            if app.status_message.is_empty() {
                return Effect::None;
            }
            debug!("Sync healthy, clearing status: {}", app.status_message);
            app.status_message.clear();
            Effect::Render
        }
        Action::Quit => Effect::Quit,
    }
}
