//! # Room Registry
//!
//! Ordered room list, per-room view state, and the current selection.
//!
//! ```text
//! RoomRegistry
//! ├── order: Vec<RoomId>                      // list / navigation order
//! ├── views: HashMap<RoomId, RoomViewState>   // additive only
//! └── current: usize                          // index into order
//! ```
//!
//! Every id in `order` has a view. Views are inserted before the new order is
//! installed, so nothing can observe an id without its view.

use std::collections::HashMap;

use log::debug;

use crate::core::room::{RoomId, RoomMetadata, RoomViewState};

#[derive(Debug, Default)]
pub struct RoomRegistry {
    order: Vec<RoomId>,
    views: HashMap<RoomId, RoomViewState>,
    current: usize,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the room list. Unknown rooms get a fresh view built from
    /// `resolve`; known rooms keep theirs untouched. Selection resets to the
    /// first room.
    pub fn set_rooms<F>(&mut self, rooms: Vec<RoomId>, resolve: F)
    where
        F: Fn(&RoomId) -> Option<RoomMetadata>,
    {
        for id in &rooms {
            if !self.views.contains_key(id) {
                let view = RoomViewState::new(id, resolve(id).as_ref());
                debug!("Registering room {} as {:?}", id, view.display_name);
                self.views.insert(id.clone(), view);
            }
        }
        self.order = rooms;
        self.current = 0;
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn current(&self) -> Option<&RoomId> {
        self.order.get(self.current)
    }

    pub fn current_index(&self) -> Option<usize> {
        (!self.order.is_empty()).then_some(self.current)
    }

    pub fn current_view(&self) -> Option<&RoomViewState> {
        self.current().and_then(|id| self.views.get(id))
    }

    pub fn view(&self, id: &RoomId) -> Option<&RoomViewState> {
        self.views.get(id)
    }

    /// Rooms in list order.
    pub fn rooms(&self) -> impl Iterator<Item = (&RoomId, &RoomViewState)> {
        self.order
            .iter()
            .filter_map(|id| self.views.get(id).map(|view| (id, view)))
    }

    /// Select a room by index, wrapping in both directions (-1 is the last
    /// room). Does nothing when the list is empty.
    pub fn switch_to(&mut self, index: isize) {
        if self.order.is_empty() {
            return;
        }
        let len = self.order.len() as isize;
        self.current = index.rem_euclid(len) as usize;
        debug!("Switched to room {} ({})", self.current, self.order[self.current]);
    }

    /// Move the selection relative to the current room.
    pub fn switch_by(&mut self, delta: isize) {
        self.switch_to(self.current as isize + delta);
    }

    /// Append to a room's log. Returns false (and changes nothing) when the
    /// room has no view yet.
    pub fn append_message(&mut self, id: &RoomId, sender: &str, body: &str) -> bool {
        match self.views.get_mut(id) {
            Some(view) => {
                view.push_message(sender, body);
                true
            }
            None => {
                debug!("Dropping message for untracked room {}", id);
                false
            }
        }
    }

    pub fn set_typing(&mut self, id: &RoomId, users: Vec<String>) -> bool {
        match self.views.get_mut(id) {
            Some(view) => {
                view.set_typing(users);
                true
            }
            None => false,
        }
    }

    pub fn update_metadata(&mut self, id: &RoomId, metadata: &RoomMetadata) -> bool {
        match self.views.get_mut(id) {
            Some(view) => {
                view.apply_metadata(id, metadata);
                true
            }
            None => false,
        }
    }
}
