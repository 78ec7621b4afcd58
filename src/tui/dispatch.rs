//! # Key Dispatch
//!
//! Decides what a raw key press means before the input box sees it.
//!
//! The decision is a table of rules checked top to bottom; the first rule
//! whose predicate matches wins:
//!
//! | # | Key                 | Outcome            |
//! |---|---------------------|--------------------|
//! | 1 | Ctrl+Down           | next room          |
//! | 2 | Ctrl+Up             | previous room      |
//! | 3 | any other Ctrl+key  | pass through       |
//! | 4 | PageUp / PageDown   | scroll active room |
//! | - | anything else       | pass through       |
//!
//! "Pass through" hands the key back to the caller, which offers it to the
//! global shortcuts (Ctrl+C) and then to the input box.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    NextRoom,
    PrevRoom,
    /// Forward the key to the active room's pane
    ScrollActiveRoom,
    PassThrough,
}

struct KeyRule {
    matches: fn(&KeyEvent) -> bool,
    action: KeyAction,
}

/// Any combination that includes Control, so Ctrl+Shift+Down still navigates.
fn ctrl(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
}

const RULES: [KeyRule; 4] = [
    KeyRule {
        matches: |key| ctrl(key) && key.code == KeyCode::Down,
        action: KeyAction::NextRoom,
    },
    KeyRule {
        matches: |key| ctrl(key) && key.code == KeyCode::Up,
        action: KeyAction::PrevRoom,
    },
    KeyRule {
        matches: ctrl,
        action: KeyAction::PassThrough,
    },
    KeyRule {
        matches: |key| matches!(key.code, KeyCode::PageUp | KeyCode::PageDown),
        action: KeyAction::ScrollActiveRoom,
    },
];

pub fn dispatch(key: &KeyEvent) -> KeyAction {
    RULES
        .iter()
        .find(|rule| (rule.matches)(key))
        .map_or(KeyAction::PassThrough, |rule| rule.action)
}
