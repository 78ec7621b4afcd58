//! # Core Application Logic
//!
//! This module contains mxchat's view-state and routing logic.
//! It knows nothing about the terminal or the network.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • RoomRegistry         │
//!                    │  • Action / update()    │
//!                    │  • Command routing      │
//!                    │                         │
//!                    │  No I/O. No UI. Pure.   │
//!                    └───────────┬─────────────┘
//!                                │
//!                 ┌──────────────┴──────────────┐
//!                 ▼                             ▼
//!          ┌────────────┐                ┌────────────┐
//!          │    TUI     │                │  Protocol  │
//!          │  Adapter   │                │  (Matrix)  │
//!          │ (ratatui)  │                │            │
//!          └────────────┘                └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`room`]: `RoomId`, `RoomMetadata`, `RoomViewState`
//! - [`registry`]: `RoomRegistry`, the ordered room list and selection
//! - [`command`]: parsing and routing of the input line
//! - [`state`]: the `App` struct
//! - [`action`]: the `Action` enum and `update()`
//! - [`config`]: config file loading and resolution

pub mod action;
pub mod command;
pub mod config;
pub mod registry;
pub mod room;
pub mod state;
