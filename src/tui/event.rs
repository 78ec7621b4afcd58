use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use log::warn;

/// Terminal input, after dropping what the UI never reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuiEvent {
    /// Key press or repeat (releases are filtered out)
    Key(KeyEvent),
    /// Bracketed paste
    Paste(String),
    Resize,
}

/// Poll for an event without blocking (returns immediately)
pub fn poll_event_immediate() -> Option<TuiEvent> {
    poll_event_timeout(Duration::ZERO)
}

/// Poll for an event, blocking up to `timeout`
pub fn poll_event_timeout(timeout: Duration) -> Option<TuiEvent> {
    match event::poll(timeout) {
        Ok(true) => {}
        Ok(false) => return None,
        Err(e) => {
            warn!("Failed to poll terminal events: {}", e);
            return None;
        }
    }
    match event::read() {
        Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
            log::debug!("Key event: {:?} with modifiers {:?}", key.code, key.modifiers);
            Some(TuiEvent::Key(key))
        }
        Ok(Event::Paste(data)) => Some(TuiEvent::Paste(data)),
        Ok(Event::Resize(..)) => Some(TuiEvent::Resize),
        Ok(_) => None,
        Err(e) => {
            warn!("Failed to read terminal event: {}", e);
            None
        }
    }
}
