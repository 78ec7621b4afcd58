use crate::core::state::App;
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{RoomList, RoomView, TitleBar};

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, BorderType, Paragraph};

/// Shown in the room page until the first room arrives.
pub const EMPTY_PAGE_TEXT: &str = "No rooms yet. Join one with /join <room>";

/// ```text
/// ┌ title bar ──────────────────────────────────┐
/// │ rooms     │ ╭ topic ──────────────────────╮ │
/// │           │ │ <sender> body               │ │
/// │           │ ╰─────────────────────────────╯ │
/// │           │ Typing: ...                     │
/// │           │ ╭ Input ──────────────────────╮ │
/// │           │ ╰─────────────────────────────╯ │
/// └─────────────────────────────────────────────┘
/// ```
pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState) {
    use Constraint::{Length, Min};
    let [title_area, body_area] = Layout::vertical([Length(1), Min(0)]).areas(frame.area());
    let [list_area, main_area] =
        Layout::horizontal([Length(tui.room_list_width), Min(0)]).areas(body_area);
    let [page_area, input_area] = Layout::vertical([Min(0), Length(3)]).areas(main_area);

    let current_view = app.registry.current_view();

    TitleBar::new(
        app.user_id.clone(),
        current_view.map(|view| view.display_name.clone()),
        app.status_message.clone(),
    )
    .render(frame, title_area);

    RoomList::new(&app.registry, &mut tui.room_list).render(frame, list_area);

    match (app.registry.current(), current_view) {
        (Some(room), Some(view)) => {
            let pane = tui.panes.entry(room.clone()).or_default();
            RoomView::new(view, pane).render(frame, page_area);
        }
        _ => draw_empty_page(frame, page_area),
    }

    // Input last so its cursor position wins
    tui.input_box.render(frame, input_area);
}

fn draw_empty_page(frame: &mut Frame, area: Rect) {
    let placeholder = Paragraph::new(EMPTY_PAGE_TEXT)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(Block::bordered().border_type(BorderType::Rounded));
    frame.render_widget(placeholder, area);
}
