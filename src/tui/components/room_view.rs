//! # RoomView Component
//!
//! The page for one room: a bordered, scrollable message log titled with
//! the room topic, and a one-line status strip (typing notices) beneath it.
//!
//! ## Architecture
//!
//! `RoomView` is a transient component (created each frame) that borrows the
//! room's `RoomViewState` (props) and its `RoomPaneState` (persistent scroll
//! state kept in `TuiState`, one per room). Scroll position survives room
//! switches because each room keeps its own pane state.

use crossterm::event::KeyCode;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect, Size};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Paragraph, Wrap};
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::core::command::SYSTEM_SENDER;
use crate::core::room::{MessageLine, RoomViewState};
use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

/// Scroll state for one room's message log.
pub struct RoomPaneState {
    pub scroll_state: ScrollViewState,
    /// When true, auto-scroll to bottom on new content
    pub stick_to_bottom: bool,
    /// Last known viewport height (for scroll clamping between frames)
    pub viewport_height: u16,
    /// Last measured log height in rows
    pub content_height: u16,
}

impl Default for RoomPaneState {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomPaneState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            stick_to_bottom: true,
            viewport_height: 0,
            content_height: 0,
        }
    }

    fn max_offset(&self) -> u16 {
        self.content_height.saturating_sub(self.viewport_height)
    }

    /// Clamp scroll offset so it never exceeds the content bounds.
    pub fn clamp_scroll(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Clamp scroll and re-engage auto-scroll if the user has reached the bottom.
    pub fn repin_if_at_bottom(&mut self) {
        let max_y = self.max_offset();
        let current = self.scroll_state.offset();
        if current.y >= max_y {
            self.stick_to_bottom = true;
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }
}

impl EventHandler for RoomPaneState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        let TuiEvent::Key(key) = event else {
            return None;
        };
        match key.code {
            KeyCode::PageUp => {
                self.scroll_state.scroll_page_up();
                self.stick_to_bottom = false;
                Some(())
            }
            KeyCode::PageDown => {
                self.scroll_state.scroll_page_down();
                self.repin_if_at_bottom();
                Some(())
            }
            _ => None,
        }
    }
}

fn message_line(message: &MessageLine) -> Line<'_> {
    let sender_style = if message.sender == SYSTEM_SENDER {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    };
    Line::from(vec![
        Span::styled(format!("<{}>", message.sender), sender_style),
        Span::raw(" "),
        Span::raw(message.body.as_str()),
    ])
}

pub struct RoomView<'a> {
    pub view: &'a RoomViewState,
    pub state: &'a mut RoomPaneState,
}

impl<'a> RoomView<'a> {
    pub fn new(view: &'a RoomViewState, state: &'a mut RoomPaneState) -> Self {
        Self { view, state }
    }
}

impl<'a> Component for RoomView<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let [log_area, status_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(area);

        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(format!(" {} ", self.view.topic));
        let inner = block.inner(log_area);
        frame.render_widget(block, log_area);

        // -1 for the scrollbar column
        let content_width = inner.width.saturating_sub(1);
        let lines: Vec<Line> = self.view.messages().iter().map(message_line).collect();
        let log = Paragraph::new(lines).wrap(Wrap { trim: false });
        let content_height = u16::try_from(log.line_count(content_width)).unwrap_or(u16::MAX);

        self.state.viewport_height = inner.height;
        self.state.content_height = content_height;
        if !self.state.stick_to_bottom {
            self.state.clamp_scroll();
        }

        let mut scroll_view = ScrollView::new(Size::new(content_width, content_height))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Automatic)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);
        scroll_view.render_widget(log, Rect::new(0, 0, content_width, content_height));

        if self.state.stick_to_bottom {
            self.state.scroll_state.scroll_to_bottom();
        }
        frame.render_stateful_widget(scroll_view, inner, &mut self.state.scroll_state);

        let status = Paragraph::new(self.view.status_text())
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(status, status_area);
    }
}
