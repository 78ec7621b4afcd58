//! # InputBox Component
//!
//! Single-line text entry at the bottom of the screen.
//!
//! ## Responsibilities
//!
//! - Capture text input and pastes
//! - Handle editing (backspace, delete, cursor movement)
//! - Emit `Submit` on Enter, clearing itself
//! - Keep the cursor visible by scrolling the line horizontally
//!
//! Keys reach the InputBox only after the dispatcher passed them through, so
//! Control combinations never get here as text.

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, BorderType, Paragraph};
use unicode_width::UnicodeWidthChar;

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

/// High-level events emitted by the InputBox
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// User submitted a non-empty line (Enter pressed); the box is now empty
    Submit(String),
    /// Text content changed
    Edited,
    /// Cursor moved without changing the text
    CursorMoved,
}

#[derive(Default)]
pub struct InputBox {
    /// Text buffer
    pub buffer: String,
    /// Cursor position as byte offset in buffer (0..=buffer.len())
    cursor: usize,
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.buffer[..self.cursor]
            .chars()
            .next_back()
            .map(|c| self.cursor - c.len_utf8())
    }

    fn next_boundary(&self) -> Option<usize> {
        self.buffer[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }

    fn insert_str(&mut self, text: &str) {
        self.buffer.insert_str(self.cursor, text);
        self.cursor += text.len();
    }

    /// Visible part of the buffer for an inner width, and the cursor column
    /// within it.
    fn visible(&self, width: u16) -> (String, u16) {
        let width = usize::from(width.max(1));
        let before: Vec<(char, usize)> = self.buffer[..self.cursor]
            .chars()
            .map(|c| (c, c.width().unwrap_or(0)))
            .collect();
        let cursor_col: usize = before.iter().map(|(_, w)| w).sum();

        // Drop leading characters until the cursor fits on screen
        let mut skipped_cols = 0;
        let mut skipped_bytes = 0;
        for (c, w) in &before {
            if cursor_col - skipped_cols < width {
                break;
            }
            skipped_cols += w;
            skipped_bytes += c.len_utf8();
        }

        let mut shown = String::new();
        let mut used = 0;
        for c in self.buffer[skipped_bytes..].chars() {
            let w = c.width().unwrap_or(0);
            if used + w > width {
                break;
            }
            used += w;
            shown.push(c);
        }
        (shown, (cursor_col - skipped_cols) as u16)
    }
}

impl Component for InputBox {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let inner_width = area.width.saturating_sub(2);
        let (text, cursor_col) = self.visible(inner_width);

        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title("Input");
        let input = Paragraph::new(text)
            .block(block)
            .style(Style::default().fg(Color::Green));
        frame.render_widget(input, area);

        frame.set_cursor_position((area.x + 1 + cursor_col, area.y + 1));
    }
}

impl EventHandler for InputBox {
    type Event = InputEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        let key = match event {
            TuiEvent::Paste(text) => {
                let line: String = text
                    .chars()
                    .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
                    .collect();
                if line.is_empty() {
                    return None;
                }
                self.insert_str(&line);
                return Some(InputEvent::Edited);
            }
            TuiEvent::Key(key) => key,
            TuiEvent::Resize => return None,
        };

        match key.code {
            KeyCode::Char(c)
                if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                let mut buf = [0u8; 4];
                self.insert_str(c.encode_utf8(&mut buf));
                Some(InputEvent::Edited)
            }
            KeyCode::Backspace => self.prev_boundary().map(|prev| {
                self.buffer.drain(prev..self.cursor);
                self.cursor = prev;
                InputEvent::Edited
            }),
            KeyCode::Delete => self.next_boundary().map(|next| {
                self.buffer.drain(self.cursor..next);
                InputEvent::Edited
            }),
            KeyCode::Left => self.prev_boundary().map(|prev| {
                self.cursor = prev;
                InputEvent::CursorMoved
            }),
            KeyCode::Right => self.next_boundary().map(|next| {
                self.cursor = next;
                InputEvent::CursorMoved
            }),
            KeyCode::Home => (self.cursor != 0).then(|| {
                self.cursor = 0;
                InputEvent::CursorMoved
            }),
            KeyCode::End => (self.cursor != self.buffer.len()).then(|| {
                self.cursor = self.buffer.len();
                InputEvent::CursorMoved
            }),
            KeyCode::Enter => {
                if self.buffer.is_empty() {
                    return None;
                }
                self.cursor = 0;
                Some(InputEvent::Submit(std::mem::take(&mut self.buffer)))
            }
            _ => None,
        }
    }
}
