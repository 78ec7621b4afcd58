//! # TitleBar Component
//!
//! Top line of the screen: who is logged in, which room is shown, and the
//! session status ("Syncing...", the last error).
//!
//! Purely presentational; everything arrives as props:
//!
//! 1. **Room and status**: `"mxchat (@me:hs) | #rust:hs | Syncing..."`
//! 2. **Room only**: `"mxchat (@me:hs) | #rust:hs"`
//! 3. **No room**: `"mxchat (@me:hs) | Syncing..."`

use crate::tui::component::Component;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::Span;

pub struct TitleBar {
    pub user_id: String,
    /// Display name of the current room, if any
    pub room_name: Option<String>,
    pub status_message: String,
}

impl TitleBar {
    pub fn new(user_id: String, room_name: Option<String>, status_message: String) -> Self {
        Self {
            user_id,
            room_name,
            status_message,
        }
    }

    fn text(&self) -> String {
        let mut parts = vec![format!("mxchat ({})", self.user_id)];
        if let Some(room) = &self.room_name {
            parts.push(room.clone());
        }
        if !self.status_message.is_empty() {
            parts.push(self.status_message.clone());
        }
        parts.join(" | ")
    }
}

impl Component for TitleBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let title = Span::styled(self.text(), Style::default().add_modifier(Modifier::BOLD));
        frame.render_widget(title, area);
    }
}
