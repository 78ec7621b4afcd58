//! # TUI Components
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! - `TitleBar`: Top status line with user, current room, and session status
//! - `RoomList`: Column of joined rooms with the current one highlighted
//!
//! ### Stateful Components (Event-Driven)
//!
//! - `InputBox`: Single-line text entry
//! - `RoomView`: One room's scrollable log plus its typing status line
//!
//! Stateful components keep their persistent half (`InputBox`,
//! `RoomPaneState`) in `TuiState`; the render wrappers are rebuilt each frame
//! around borrowed state.

mod title_bar;
pub use title_bar::TitleBar;

pub mod input_box;
pub use input_box::{InputBox, InputEvent};
pub mod room_list;
pub use room_list::RoomList;
pub mod room_view;
pub use room_view::{RoomPaneState, RoomView};
