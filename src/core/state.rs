//! # Application State
//!
//! Core state for mxchat. Domain logic only: no terminal types.
//! Presentation state (scroll offsets, input buffer) lives in the `tui` module.
//!
//! ```text
//! App
//! ├── registry: RoomRegistry    // rooms, views, current selection
//! ├── user_id: String           // logged-in account, for the title bar
//! └── status_message: String    // last session error or notice
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use crate::core::registry::RoomRegistry;

pub struct App {
    pub registry: RoomRegistry,
    pub user_id: String,
    pub status_message: String,
}

impl App {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            registry: RoomRegistry::new(),
            user_id: user_id.into(),
            status_message: String::from("Syncing..."),
        }
    }
}
