//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! and translates keyboard events into core::Action values.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Event Loop
//!
//! One thread owns `App`. Each turn it:
//!
//! 1. redraws if anything changed,
//! 2. polls the terminal (up to `POLL_INTERVAL`) and drains pending input,
//! 3. drains actions sent by the sync task and by finished requests.
//!
//! Protocol work runs on tokio tasks that only ever talk back through the
//! action channel, so view state is never touched off the UI thread.

mod component;
mod components;
mod dispatch;
mod event;
mod ui;

use log::{debug, info, warn};
use std::collections::HashMap;
use std::io::stdout;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use crossterm::cursor::{SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use crate::core::action::{Action, Effect, SessionRequest, update};
use crate::core::room::RoomId;
use crate::core::state::App;
use crate::protocol::{ChatSession, MatrixSession, SessionError};
use crate::tui::component::EventHandler;
use crate::tui::components::{InputBox, InputEvent, RoomPaneState};
use crate::tui::dispatch::{KeyAction, dispatch};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub input_box: InputBox,
    pub room_list: ListState,
    /// Scroll state per room, created on first render of that room
    pub panes: HashMap<RoomId, RoomPaneState>,
    pub room_list_width: u16,
}

impl TuiState {
    pub fn new(room_list_width: u16) -> Self {
        Self {
            input_box: InputBox::new(),
            room_list: ListState::default(),
            panes: HashMap::new(),
            room_list_width,
        }
    }
}

/// Why the event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Quit,
    ClearCache,
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        execute!(
            stdout(),
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )?;
        info!("Terminal modes enabled (bracketed paste, steady block cursor, keyboard enhancement)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), PopKeyboardEnhancementFlags, DisableBracketedPaste);
    }
}

fn is_force_quit(event: &TuiEvent) -> bool {
    matches!(event, TuiEvent::Key(key)
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

/// Route one terminal event: navigation and scroll keys first, then Ctrl+C,
/// then the input box.
pub fn handle_event(app: &mut App, tui: &mut TuiState, event: &TuiEvent) -> Effect {
    let key_action = match event {
        TuiEvent::Resize => return Effect::Render,
        TuiEvent::Key(key) => dispatch(key),
        TuiEvent::Paste(_) => KeyAction::PassThrough,
    };

    match key_action {
        KeyAction::NextRoom => update(app, Action::NextRoom),
        KeyAction::PrevRoom => update(app, Action::PrevRoom),
        KeyAction::ScrollActiveRoom => match app.registry.current() {
            Some(room) => {
                tui.panes.entry(room.clone()).or_default().handle_event(event);
                Effect::Render
            }
            None => Effect::None,
        },
        KeyAction::PassThrough if is_force_quit(event) => update(app, Action::Quit),
        KeyAction::PassThrough => match tui.input_box.handle_event(event) {
            Some(InputEvent::Submit(text)) => update(app, Action::InputSubmitted(text)),
            Some(InputEvent::Edited) => update(app, Action::InputChanged),
            Some(InputEvent::CursorMoved) => Effect::Render,
            None => Effect::None,
        },
    }
}

/// Fill in metadata the sync task didn't send for newly listed rooms, from
/// what the session already has cached.
fn with_cached_metadata(action: Action, session: &dyn ChatSession) -> Action {
    match action {
        Action::RoomListChanged {
            rooms,
            mut metadata,
        } => {
            for room in &rooms {
                if !metadata.contains_key(room)
                    && let Some(meta) = session.load_room_metadata(room)
                {
                    metadata.insert(room.clone(), meta);
                }
            }
            Action::RoomListChanged { rooms, metadata }
        }
        other => other,
    }
}

/// Apply an action coming from a background task.
pub fn apply_action(app: &mut App, action: Action, session: &dyn ChatSession) -> Effect {
    debug!("Event loop received: {:?}", action);
    update(app, with_cached_metadata(action, session))
}

/// Perform an effect's I/O. Returns `Some` when the loop should stop.
pub fn execute(
    effect: Effect,
    session: &Arc<dyn ChatSession>,
    tx: &mpsc::Sender<Action>,
) -> Option<Shutdown> {
    match effect {
        Effect::None | Effect::Render => None,
        Effect::Request(request) => {
            spawn_request(request, session.clone(), tx.clone());
            None
        }
        Effect::RefreshRooms(rooms) => {
            for room in rooms {
                spawn_room_refresh(room, session.clone());
            }
            None
        }
        Effect::Quit => Some(Shutdown::Quit),
        Effect::ClearCacheAndQuit => Some(Shutdown::ClearCache),
    }
}

fn spawn_request(request: SessionRequest, session: Arc<dyn ChatSession>, tx: mpsc::Sender<Action>) {
    tokio::spawn(async move {
        let (what, result) = match &request {
            SessionRequest::SendMessage { room, body } => {
                ("send message", session.send_message(room, body).await)
            }
            SessionRequest::SendTyping { room } => {
                ("send typing notice", session.send_typing(room).await)
            }
            SessionRequest::Join {
                identifier,
                server_hint,
            } => (
                "join room",
                session
                    .join_room(identifier, server_hint.as_deref())
                    .await
                    .map(|_| ()),
            ),
            SessionRequest::Leave { room } => ("leave room", session.leave_room(room).await),
        };

        if let Err(e) = result {
            warn!("Failed to {}: {}", what, e);
            // Typing notices are fire-and-forget
            if !matches!(request, SessionRequest::SendTyping { .. })
                && tx
                    .send(Action::SessionError(format!("Failed to {what}: {e}")))
                    .is_err()
            {
                warn!("Failed to report request error: receiver dropped");
            }
        }
    });
}

fn spawn_room_refresh(room: RoomId, session: Arc<dyn ChatSession>) {
    tokio::spawn(async move {
        if let Err(e) = session.update_room_info(&room).await {
            warn!("Failed to refresh metadata for {}: {}", room, e);
        }
    });
}

/// Forget cached rooms and the sync position, and write that to disk.
pub async fn clear_cache(session: &dyn ChatSession) -> Result<(), SessionError> {
    session.clear_cached_state().await?;
    session.persist_state().await
}

/// Stop the sync task and wait until it is gone, then clear the cache.
/// A sync round still in flight would otherwise write rooms and the sync
/// token back after they were cleared.
pub async fn stop_sync_and_clear_cache(
    sync_task: JoinHandle<()>,
    session: &dyn ChatSession,
) -> Result<(), SessionError> {
    sync_task.abort();
    if let Err(e) = sync_task.await
        && !e.is_cancelled()
    {
        warn!("Sync task ended abnormally: {}", e);
    }
    clear_cache(session).await
}

pub fn run(
    session: Arc<MatrixSession>,
    tx: mpsc::Sender<Action>,
    rx: mpsc::Receiver<Action>,
    room_list_width: u16,
) -> std::io::Result<()> {
    let mut app = App::new(session.user_id());
    let mut tui = TuiState::new(room_list_width);

    let sync_task = tokio::spawn(session.clone().run_sync());
    let session: Arc<dyn ChatSession> = session;

    let mut terminal = ratatui::init();
    let terminal_mode_guard = TerminalModeGuard::new();

    let mut needs_redraw = true;
    let shutdown = 'event_loop: loop {
        if needs_redraw {
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui))?;
            needs_redraw = false;
        }

        // Process first event + drain ALL pending events before next draw
        let first_event = poll_event_timeout(POLL_INTERVAL);
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            needs_redraw = true;
            let effect = handle_event(&mut app, &mut tui, &event);
            if let Some(shutdown) = execute(effect, &session, &tx) {
                break 'event_loop shutdown;
            }
        }

        // Handle background task actions (sync results, request failures)
        while let Ok(action) = rx.try_recv() {
            let effect = apply_action(&mut app, action, session.as_ref());
            if effect != Effect::None {
                needs_redraw = true;
            }
            if let Some(shutdown) = execute(effect, &session, &tx) {
                break 'event_loop shutdown;
            }
        }
    };

    drop(terminal_mode_guard);
    ratatui::restore();
    info!("Event loop stopped: {:?}", shutdown);

    if shutdown == Shutdown::ClearCache {
        let result = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current()
                .block_on(stop_sync_and_clear_cache(sync_task, session.as_ref()))
        });
        match result {
            Ok(()) => println!("Cleared cached rooms and sync position."),
            Err(e) => {
                warn!("Failed to clear cache: {}", e);
                eprintln!("Failed to clear cache: {e}");
            }
        }
    } else {
        sync_task.abort();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::room::RoomMetadata;
    use crate::test_support::{RecordingSession, room_list, test_app};
    use crossterm::event::KeyEvent;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> TuiEvent {
        TuiEvent::Key(KeyEvent::new(code, modifiers))
    }

    fn type_line(app: &mut App, tui: &mut TuiState, text: &str) -> Vec<Effect> {
        text.chars()
            .map(|c| handle_event(app, tui, &key(KeyCode::Char(c), KeyModifiers::NONE)))
            .collect()
    }

    fn recording() -> (Arc<RecordingSession>, Arc<dyn ChatSession>) {
        let recorder = Arc::new(RecordingSession::default());
        let session: Arc<dyn ChatSession> = recorder.clone();
        (recorder, session)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_ctrl_arrows_switch_rooms() {
        let mut app = test_app();
        let mut tui = TuiState::new(20);
        update(&mut app, room_list(&["!a:x", "!b:x", "!c:x"]));

        let effect = handle_event(&mut app, &mut tui, &key(KeyCode::Down, KeyModifiers::CONTROL));
        assert_eq!(effect, Effect::Render);
        assert_eq!(app.registry.current_index(), Some(1));

        handle_event(&mut app, &mut tui, &key(KeyCode::Up, KeyModifiers::CONTROL));
        handle_event(&mut app, &mut tui, &key(KeyCode::Up, KeyModifiers::CONTROL));
        assert_eq!(app.registry.current_index(), Some(2));
        assert!(tui.input_box.buffer.is_empty());
    }

    #[test]
    fn test_typing_requests_typing_notice() {
        let mut app = test_app();
        let mut tui = TuiState::new(20);
        update(&mut app, room_list(&["!a:x"]));

        let effects = type_line(&mut app, &mut tui, "hi");
        assert_eq!(tui.input_box.buffer, "hi");
        assert!(effects.iter().all(|e| *e
            == Effect::Request(SessionRequest::SendTyping {
                room: RoomId::new("!a:x")
            })));
    }

    #[test]
    fn test_enter_submits_message() {
        let mut app = test_app();
        let mut tui = TuiState::new(20);
        update(&mut app, room_list(&["!a:x"]));
        type_line(&mut app, &mut tui, "hello");

        let effect = handle_event(&mut app, &mut tui, &key(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(
            effect,
            Effect::Request(SessionRequest::SendMessage {
                room: RoomId::new("!a:x"),
                body: "hello".into()
            })
        );
        assert!(tui.input_box.buffer.is_empty());
    }

    #[test]
    fn test_ctrl_c_quits_and_other_ctrl_keys_are_ignored() {
        let mut app = test_app();
        let mut tui = TuiState::new(20);

        let effect = handle_event(&mut app, &mut tui, &key(KeyCode::Char('x'), KeyModifiers::CONTROL));
        assert_eq!(effect, Effect::None);
        assert!(tui.input_box.buffer.is_empty());

        let effect = handle_event(&mut app, &mut tui, &key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(effect, Effect::Quit);
    }

    #[test]
    fn test_page_keys_scroll_current_pane_only() {
        let mut app = test_app();
        let mut tui = TuiState::new(20);

        let effect = handle_event(&mut app, &mut tui, &key(KeyCode::PageUp, KeyModifiers::NONE));
        assert_eq!(effect, Effect::None);

        update(&mut app, room_list(&["!a:x", "!b:x"]));
        let effect = handle_event(&mut app, &mut tui, &key(KeyCode::PageUp, KeyModifiers::NONE));
        assert_eq!(effect, Effect::Render);
        assert!(!tui.panes[&RoomId::new("!a:x")].stick_to_bottom);
        assert!(!tui.panes.contains_key(&RoomId::new("!b:x")));
    }

    #[test]
    fn test_cached_metadata_fills_gaps() {
        struct CachedSession;

        #[async_trait::async_trait]
        impl ChatSession for CachedSession {
            async fn send_message(&self, _: &RoomId, _: &str) -> Result<(), SessionError> {
                Ok(())
            }
            async fn send_typing(&self, _: &RoomId) -> Result<(), SessionError> {
                Ok(())
            }
            async fn join_room(&self, id: &str, _: Option<&str>) -> Result<RoomId, SessionError> {
                Ok(RoomId::new(id))
            }
            async fn leave_room(&self, _: &RoomId) -> Result<(), SessionError> {
                Ok(())
            }
            async fn update_room_info(&self, _: &RoomId) -> Result<(), SessionError> {
                Ok(())
            }
            fn load_room_metadata(&self, _: &RoomId) -> Option<RoomMetadata> {
                Some(RoomMetadata {
                    name: Some("Cached".into()),
                    ..RoomMetadata::default()
                })
            }
            async fn clear_cached_state(&self) -> Result<(), SessionError> {
                Ok(())
            }
            async fn persist_state(&self) -> Result<(), SessionError> {
                Ok(())
            }
        }

        let mut app = test_app();
        let effect = apply_action(&mut app, room_list(&["!a:x"]), &CachedSession);
        assert_eq!(effect, Effect::RefreshRooms(vec![RoomId::new("!a:x")]));
        assert_eq!(
            app.registry.current_view().map(|v| v.display_name.as_str()),
            Some("Cached")
        );
    }

    #[tokio::test]
    async fn test_execute_spawns_requests() {
        let (recorder, session) = recording();
        let (tx, _rx) = mpsc::channel();

        let effect = Effect::Request(SessionRequest::Join {
            identifier: "#rust:example.org".into(),
            server_hint: Some("example.org".into()),
        });
        assert_eq!(execute(effect, &session, &tx), None);
        let effect = Effect::RefreshRooms(vec![RoomId::new("!a:x")]);
        assert_eq!(execute(effect, &session, &tx), None);
        settle().await;

        let calls = recorder.calls();
        assert!(calls.contains(&"join #rust:example.org example.org".to_string()));
        assert!(calls.contains(&"refresh !a:x".to_string()));
    }

    #[tokio::test]
    async fn test_execute_stops_loop_on_quit() {
        let (_recorder, session) = recording();
        let (tx, _rx) = mpsc::channel();

        assert_eq!(execute(Effect::Quit, &session, &tx), Some(Shutdown::Quit));
        assert_eq!(
            execute(Effect::ClearCacheAndQuit, &session, &tx),
            Some(Shutdown::ClearCache)
        );
        assert_eq!(execute(Effect::Render, &session, &tx), None);
    }

    #[tokio::test]
    async fn test_clear_cache_clears_then_persists() {
        let (recorder, session) = recording();
        clear_cache(session.as_ref()).await.unwrap();
        assert_eq!(recorder.calls(), vec!["clear".to_string(), "persist".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_clear_cache_waits_for_sync_task_to_stop() {
        let (recorder, session) = recording();
        let syncing = session.clone();
        let sync_task: JoinHandle<()> = tokio::spawn(async move {
            loop {
                let _ = syncing.persist_state().await;
                tokio::task::yield_now().await;
            }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        stop_sync_and_clear_cache(sync_task, session.as_ref())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Nothing from the sync task lands after the clear
        let calls = recorder.calls();
        assert!(calls.len() >= 2);
        assert_eq!(calls[calls.len() - 2..], ["clear", "persist"]);
    }
}
