//! # Session Store
//!
//! Login and sync state persisted to `~/.mxchat/session.json`.
//!
//! The store keeps what the client needs to resume without a full login:
//! the access token, the `/sync` position, the filter id, and name/topic
//! metadata of joined rooms. Room history is not persisted.
//!
//! All writes use atomic rename (write `.tmp`, then `rename()`) for crash safety.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::config::data_dir;
use crate::core::room::{RoomId, RoomMetadata};

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct SessionStore {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub next_batch: Option<String>,
    #[serde(default)]
    pub filter_id: Option<String>,
    /// Unix timestamp of the last save
    #[serde(default)]
    pub saved_at: i64,
    /// Joined rooms, sorted by id so the room list order is stable
    #[serde(default)]
    pub rooms: BTreeMap<RoomId, RoomMetadata>,
}

impl SessionStore {
    /// Load from `path`. A missing file is an empty store.
    pub fn load(path: &Path) -> io::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn save(&mut self, path: &Path) -> io::Result<()> {
        self.saved_at = Utc::now().timestamp();
        atomic_write_json(path, self)?;
        debug!("Session store saved to {}", path.display());
        Ok(())
    }

    /// Drop cached rooms, sync position and filter. Credentials stay.
    pub fn clear(&mut self) {
        self.rooms.clear();
        self.next_batch = None;
        self.filter_id = None;
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().cloned().collect()
    }

    pub fn metadata_map(&self) -> HashMap<RoomId, RoomMetadata> {
        self.rooms
            .iter()
            .map(|(id, meta)| (id.clone(), meta.clone()))
            .collect()
    }

    pub fn load_room(&self, id: &RoomId) -> Option<&RoomMetadata> {
        self.rooms.get(id)
    }
}

/// Returns `~/.mxchat/session.json`, creating the directory if needed.
pub fn session_path() -> io::Result<PathBuf> {
    let dir = data_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))?;
    fs::create_dir_all(&dir)?;
    Ok(dir.join("session.json"))
}

/// Atomically write `data` as JSON to `path` (via `.tmp` + rename).
fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
