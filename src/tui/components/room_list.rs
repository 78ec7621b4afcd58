//! # RoomList Component
//!
//! Left-hand column listing joined rooms by display name, with the current
//! room highlighted. Selection follows the registry; the `ListState` only
//! keeps the highlighted row scrolled into view.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};

use crate::core::registry::RoomRegistry;
use crate::tui::component::Component;

pub struct RoomList<'a> {
    pub registry: &'a RoomRegistry,
    pub list_state: &'a mut ListState,
}

impl<'a> RoomList<'a> {
    pub fn new(registry: &'a RoomRegistry, list_state: &'a mut ListState) -> Self {
        Self {
            registry,
            list_state,
        }
    }
}

impl<'a> Component for RoomList<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .registry
            .rooms()
            .map(|(_, view)| ListItem::new(view.display_name.as_str()))
            .collect();

        let block = Block::default()
            .borders(Borders::RIGHT)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Rooms ");

        let list = List::new(items)
            .block(block)
            .style(Style::default().fg(Color::Gray))
            .highlight_style(
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED),
            );

        self.list_state.select(self.registry.current_index());
        frame.render_stateful_widget(list, area, self.list_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::room::{RoomId, RoomMetadata};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn registry() -> RoomRegistry {
        let mut registry = RoomRegistry::new();
        registry.set_rooms(vec![RoomId::new("!a:x"), RoomId::new("!b:x")], |id| {
            (id.as_str() == "!a:x").then(|| RoomMetadata {
                name: Some("Rustaceans".into()),
                ..RoomMetadata::default()
            })
        });
        registry
    }

    #[test]
    fn test_lists_display_names() {
        let mut terminal = Terminal::new(TestBackend::new(20, 5)).unwrap();
        let registry = registry();
        let mut list_state = ListState::default();

        terminal
            .draw(|f| RoomList::new(&registry, &mut list_state).render(f, f.area()))
            .unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Rustaceans"));
        assert!(text.contains("!b:x"));
    }

    #[test]
    fn test_selection_tracks_current_room() {
        let mut terminal = Terminal::new(TestBackend::new(20, 5)).unwrap();
        let mut registry = registry();
        let mut list_state = ListState::default();

        registry.switch_to(1);
        terminal
            .draw(|f| RoomList::new(&registry, &mut list_state).render(f, f.area()))
            .unwrap();
        assert_eq!(list_state.selected(), Some(1));

        let empty = RoomRegistry::new();
        terminal
            .draw(|f| RoomList::new(&empty, &mut list_state).render(f, f.area()))
            .unwrap();
        assert_eq!(list_state.selected(), None);
    }
}
