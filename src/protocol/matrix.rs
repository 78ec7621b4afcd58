//! Matrix client-server API (v3) session.
//!
//! Implements just enough of the protocol for a single-account terminal client:
//! - Password login, with the access token kept in the session store
//! - A server-side sync filter, created once and reused
//! - `/sync` long-polling, translated into UI actions by `protocol::sync`
//! - Sending text messages and typing notifications
//! - Joining, leaving, and reading room name/alias/topic state
//!
//! Results reach the UI only through the `Action` channel; nothing here
//! touches UI state.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, mpsc};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::action::Action;
use crate::core::config::ResolvedConfig;
use crate::core::room::{RoomId, RoomMetadata};
use crate::protocol::session::{ChatSession, SessionError};
use crate::protocol::store::SessionStore;
use crate::protocol::sync::{self, ALIAS_EVENT, NAME_EVENT, SyncResponse, TOPIC_EVENT};

/// Timeline events kept per room in each sync.
const TIMELINE_LIMIT: u32 = 50;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize, Debug)]
struct LoginRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    identifier: UserIdentifier<'a>,
    password: &'a str,
    initial_device_display_name: &'static str,
}

#[derive(Serialize, Debug)]
struct UserIdentifier<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    user: &'a str,
}

#[derive(Deserialize, Debug)]
struct LoginResponse {
    user_id: String,
    access_token: String,
    #[serde(default)]
    device_id: Option<String>,
}

#[derive(Deserialize, Debug)]
struct FilterResponse {
    filter_id: String,
}

#[derive(Deserialize, Debug)]
struct JoinResponse {
    room_id: RoomId,
}

#[derive(Deserialize, Debug, Default)]
struct ErrorBody {
    #[serde(default)]
    errcode: String,
    #[serde(default)]
    error: String,
}

#[derive(Serialize, Debug)]
struct TextMessage<'a> {
    msgtype: &'static str,
    body: &'a str,
}

#[derive(Serialize, Debug)]
struct Typing {
    typing: bool,
    timeout: u64,
}

// ============================================================================
// Session
// ============================================================================

pub struct MatrixSession {
    client: Client,
    homeserver: Url,
    store: Mutex<SessionStore>,
    /// `None` keeps the store in memory only
    store_path: Option<PathBuf>,
    events: mpsc::Sender<Action>,
    sync_timeout_ms: u64,
    typing_timeout_ms: u64,
}

impl MatrixSession {
    pub fn new(
        config: &ResolvedConfig,
        store: SessionStore,
        store_path: Option<PathBuf>,
        events: mpsc::Sender<Action>,
    ) -> Result<Self, SessionError> {
        let homeserver = Url::parse(&config.homeserver)
            .map_err(|e| SessionError::Config(format!("invalid homeserver URL: {e}")))?;
        Ok(Self {
            client: Client::new(),
            homeserver,
            store: Mutex::new(store),
            store_path,
            events,
            sync_timeout_ms: config.sync_timeout_ms,
            typing_timeout_ms: config.typing_timeout_ms,
        })
    }

    fn store(&self) -> MutexGuard<'_, SessionStore> {
        // A poisoned lock only means another task panicked mid-update; the
        // store itself is still plain data.
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn user_id(&self) -> String {
        self.store().user_id.clone()
    }

    /// Build `<homeserver>/_matrix/client/v3/<segments...>`, percent-encoding
    /// each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SessionError> {
        let mut url = self.homeserver.clone();
        url.path_segments_mut()
            .map_err(|_| SessionError::Config("homeserver URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["_matrix", "client", "v3"])
            .extend(segments);
        Ok(url)
    }

    fn access_token(&self) -> Result<String, SessionError> {
        self.store()
            .access_token
            .clone()
            .ok_or_else(|| SessionError::Config("not logged in".into()))
    }

    async fn check(response: Response) -> Result<Response, SessionError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        Err(SessionError::Api {
            status: status.as_u16(),
            errcode: body.errcode,
            message: if body.error.is_empty() { text } else { body.error },
        })
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        url: Url,
        body: &T,
    ) -> Result<Response, SessionError> {
        let token = self.access_token()?;
        let response = self
            .client
            .request(method, url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;
        Self::check(response).await
    }

    async fn parse<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, SessionError> {
        response
            .json::<T>()
            .await
            .map_err(|e| SessionError::Parse(e.to_string()))
    }

    /// Log in with a password unless the store already holds a token.
    pub async fn ensure_logged_in(
        &self,
        user: &str,
        password: Option<&str>,
    ) -> Result<(), SessionError> {
        if self.store().access_token.is_some() {
            info!("Reusing stored access token for {}", self.user_id());
            return Ok(());
        }
        let password = password.ok_or_else(|| {
            SessionError::Config(
                "no stored access token; set MXCHAT_PASSWORD or account.password".into(),
            )
        })?;
        self.login(user, password).await
    }

    pub async fn login(&self, user: &str, password: &str) -> Result<(), SessionError> {
        let url = self.endpoint(&["login"])?;
        let request = LoginRequest {
            kind: "m.login.password",
            identifier: UserIdentifier {
                kind: "m.id.user",
                user,
            },
            password,
            initial_device_display_name: "mxchat",
        };
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;
        let login: LoginResponse = Self::parse(Self::check(response).await?).await?;
        info!("Logged in as {}", login.user_id);
        {
            let mut store = self.store();
            store.user_id = login.user_id;
            store.access_token = Some(login.access_token);
            store.device_id = login.device_id;
        }
        self.persist_state().await
    }

    /// Create the sync filter once; later runs reuse the stored id.
    pub async fn ensure_filter(&self) -> Result<String, SessionError> {
        if let Some(id) = self.store().filter_id.clone() {
            return Ok(id);
        }
        let user_id = self.user_id();
        let url = self.endpoint(&["user", &user_id, "filter"])?;
        let filter = json!({ "room": { "timeline": { "limit": TIMELINE_LIMIT } } });
        let response = self.send_json(reqwest::Method::POST, url, &filter).await?;
        let created: FilterResponse = Self::parse(response).await?;
        debug!("Created sync filter {}", created.filter_id);
        self.store().filter_id = Some(created.filter_id.clone());
        Ok(created.filter_id)
    }

    /// One `/sync` round trip. Returns the actions for the UI.
    pub async fn sync_once(&self) -> Result<Vec<Action>, SessionError> {
        let filter = self.ensure_filter().await?;
        let since = self.store().next_batch.clone();

        let mut url = self.endpoint(&["sync"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("filter", &filter);
            query.append_pair("timeout", &self.sync_timeout_ms.to_string());
            if let Some(since) = &since {
                query.append_pair("since", since);
            }
        }

        let response = self
            .client
            .get(url)
            .bearer_auth(self.access_token()?)
            .timeout(Duration::from_millis(self.sync_timeout_ms) + Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;
        let body: SyncResponse = Self::parse(Self::check(response).await?).await?;

        let actions = sync::apply_sync(&mut self.store(), body);
        if let Err(e) = self.persist_state().await {
            warn!("Failed to persist session after sync: {}", e);
        }
        Ok(actions)
    }

    fn emit(&self, action: Action) -> Result<(), SessionError> {
        self.events.send(action).map_err(|_| SessionError::ChannelClosed)
    }

    /// Long-running sync loop. Announces cached rooms first, then forwards
    /// every sync's actions. Backs off exponentially on retryable failures;
    /// stops on any other failure or when the UI goes away.
    pub async fn run_sync(self: Arc<Self>) {
        let cached = {
            let store = self.store();
            (!store.rooms.is_empty()).then(|| Action::RoomListChanged {
                rooms: store.room_ids(),
                metadata: store.metadata_map(),
            })
        };
        if let Some(action) = cached
            && self.emit(action).is_err()
        {
            return;
        }

        let mut backoff = INITIAL_BACKOFF;
        // Cleared on failure so the next success reports recovery
        let mut reported_synced = false;
        loop {
            match self.sync_once().await {
                Ok(actions) => {
                    backoff = INITIAL_BACKOFF;
                    debug!("Sync produced {} actions", actions.len());
                    for action in actions {
                        if self.emit(action).is_err() {
                            info!("UI closed, stopping sync loop");
                            return;
                        }
                    }
                    if !reported_synced {
                        if self.emit(Action::Synced).is_err() {
                            return;
                        }
                        reported_synced = true;
                    }
                }
                Err(e) if !e.is_retryable() => {
                    warn!("Sync failed permanently: {}", e);
                    let _ = self.emit(Action::SessionError(format!("Sync stopped: {e}")));
                    return;
                }
                Err(e) => {
                    warn!("Sync failed: {} (retrying in {:?})", e, backoff);
                    reported_synced = false;
                    if self.emit(Action::SessionError(format!("Sync failed: {e}"))).is_err() {
                        return;
                    }
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }

    async fn fetch_state(
        &self,
        room: &RoomId,
        event_type: &str,
    ) -> Result<Option<Value>, SessionError> {
        let url = self.endpoint(&["rooms", room.as_str(), "state", event_type, ""])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(self.access_token()?)
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::parse(Self::check(response).await?).await.map(Some)
    }
}

#[async_trait]
impl ChatSession for MatrixSession {
    async fn send_message(&self, room: &RoomId, body: &str) -> Result<(), SessionError> {
        let txn_id = uuid::Uuid::new_v4().to_string();
        let url = self.endpoint(&["rooms", room.as_str(), "send", "m.room.message", &txn_id])?;
        let content = TextMessage {
            msgtype: "m.text",
            body,
        };
        self.send_json(reqwest::Method::PUT, url, &content).await?;
        debug!("Sent message to {} (txn {})", room, txn_id);
        Ok(())
    }

    async fn send_typing(&self, room: &RoomId) -> Result<(), SessionError> {
        let user_id = self.user_id();
        let url = self.endpoint(&["rooms", room.as_str(), "typing", &user_id])?;
        let typing = Typing {
            typing: true,
            timeout: self.typing_timeout_ms,
        };
        self.send_json(reqwest::Method::PUT, url, &typing).await?;
        Ok(())
    }

    async fn join_room(
        &self,
        identifier: &str,
        server_hint: Option<&str>,
    ) -> Result<RoomId, SessionError> {
        let mut url = self.endpoint(&["join", identifier])?;
        if let Some(server) = server_hint {
            url.query_pairs_mut().append_pair("server_name", server);
        }
        let response = self.send_json(reqwest::Method::POST, url, &json!({})).await?;
        let joined: JoinResponse = Self::parse(response).await?;
        info!("Joined {} as {}", identifier, joined.room_id);
        Ok(joined.room_id)
    }

    async fn leave_room(&self, room: &RoomId) -> Result<(), SessionError> {
        let url = self.endpoint(&["rooms", room.as_str(), "leave"])?;
        self.send_json(reqwest::Method::POST, url, &json!({})).await?;
        info!("Left {}", room);
        Ok(())
    }

    async fn update_room_info(&self, room: &RoomId) -> Result<(), SessionError> {
        let mut fetched = Vec::new();
        for event_type in [NAME_EVENT, ALIAS_EVENT, TOPIC_EVENT] {
            let content = self.fetch_state(room, event_type).await?;
            fetched.push((event_type, content.unwrap_or(Value::Null)));
        }

        let updated = {
            let mut store = self.store();
            let Some(meta) = store.rooms.get_mut(room) else {
                debug!("Skipping metadata refresh for untracked room {}", room);
                return Ok(());
            };
            let mut changed = false;
            for (event_type, content) in &fetched {
                changed |= sync::apply_state(meta, event_type, content);
            }
            changed.then(|| meta.clone())
        };

        if let Some(metadata) = updated {
            self.emit(Action::RoomMetadataChanged {
                room: room.clone(),
                metadata,
            })?;
        }
        Ok(())
    }

    fn load_room_metadata(&self, room: &RoomId) -> Option<RoomMetadata> {
        self.store().load_room(room).cloned()
    }

    async fn clear_cached_state(&self) -> Result<(), SessionError> {
        info!("Clearing cached rooms and sync position");
        self.store().clear();
        Ok(())
    }

    async fn persist_state(&self) -> Result<(), SessionError> {
        let Some(path) = &self.store_path else {
            return Ok(());
        };
        let mut snapshot = self.store().clone();
        snapshot.save(path)?;
        Ok(())
    }
}
