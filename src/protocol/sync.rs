//! # Sync Translation
//!
//! The subset of a `/sync` response mxchat reads, and how it becomes
//! `Action`s for the UI.
//!
//! Actions come out in an order that keeps the registry consistent:
//!
//! ```text
//! 1. RoomListChanged       (only if joins/leaves changed the set)
//! 2. RoomMetadataChanged   (known rooms whose name/alias/topic changed)
//! 3. Message               (timeline m.room.message, per room)
//! 4. Typing                (ephemeral m.typing, per room)
//! ```
//!
//! A new room is therefore always registered before its first message.

use std::collections::BTreeMap;

use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::core::action::Action;
use crate::core::room::{RoomId, RoomMetadata};
use crate::protocol::store::SessionStore;

#[derive(Deserialize, Debug, Default)]
pub struct SyncResponse {
    pub next_batch: String,
    #[serde(default)]
    pub rooms: Rooms,
}

#[derive(Deserialize, Debug, Default)]
pub struct Rooms {
    #[serde(default)]
    pub join: BTreeMap<RoomId, JoinedRoom>,
    #[serde(default)]
    pub leave: BTreeMap<RoomId, Value>,
}

#[derive(Deserialize, Debug, Default)]
pub struct JoinedRoom {
    #[serde(default)]
    pub state: EventList,
    #[serde(default)]
    pub timeline: EventList,
    #[serde(default)]
    pub ephemeral: EventList,
}

#[derive(Deserialize, Debug, Default)]
pub struct EventList {
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub state_key: Option<String>,
    #[serde(default)]
    pub content: Value,
}

/// Content fields of the three state events that feed `RoomMetadata`.
#[derive(Deserialize, Debug, Default)]
pub struct StateContent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct MessageContent {
    #[serde(default)]
    body: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct TypingContent {
    #[serde(default)]
    user_ids: Vec<String>,
}

pub const NAME_EVENT: &str = "m.room.name";
pub const ALIAS_EVENT: &str = "m.room.canonical_alias";
pub const TOPIC_EVENT: &str = "m.room.topic";

fn parse_content<T: for<'de> Deserialize<'de> + Default>(content: &Value) -> T {
    serde_json::from_value(content.clone()).unwrap_or_default()
}

/// Apply one state event's content to `meta`. Returns whether anything changed.
pub fn apply_state(meta: &mut RoomMetadata, kind: &str, content: &Value) -> bool {
    let parsed: StateContent = parse_content(content);
    let (slot, value) = match kind {
        NAME_EVENT => (&mut meta.name, parsed.name),
        ALIAS_EVENT => (&mut meta.canonical_alias, parsed.alias),
        TOPIC_EVENT => (&mut meta.topic, parsed.topic),
        _ => return false,
    };
    let value = value.filter(|v| !v.is_empty());
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Fold a sync response into the store and produce the UI actions for it.
pub fn apply_sync(store: &mut SessionStore, response: SyncResponse) -> Vec<Action> {
    let before = store.room_ids();
    let mut metadata_changes = Vec::new();
    let mut timeline = Vec::new();

    for (id, room) in &response.rooms.join {
        let is_new = !store.rooms.contains_key(id);
        let meta = store.rooms.entry(id.clone()).or_default();
        let mut changed = false;
        for event in room.state.events.iter().chain(&room.timeline.events) {
            if event.state_key.is_some() {
                changed |= apply_state(meta, &event.kind, &event.content);
            }
        }
        if changed && !is_new {
            metadata_changes.push(Action::RoomMetadataChanged {
                room: id.clone(),
                metadata: meta.clone(),
            });
        }

        for event in &room.timeline.events {
            if event.kind != "m.room.message" {
                continue;
            }
            let content: MessageContent = parse_content(&event.content);
            if let (Some(sender), Some(body)) = (event.sender.clone(), content.body) {
                timeline.push(Action::Message {
                    room: id.clone(),
                    sender,
                    body,
                });
            }
        }
    }

    for id in response.rooms.leave.keys() {
        if store.rooms.remove(id).is_some() {
            debug!("Left room {}", id);
        }
    }
    store.next_batch = Some(response.next_batch);

    let mut actions = Vec::new();
    let after = store.room_ids();
    if after != before {
        actions.push(Action::RoomListChanged {
            rooms: after,
            metadata: store.metadata_map(),
        });
    }
    actions.extend(metadata_changes);
    actions.extend(timeline);

    for (id, room) in &response.rooms.join {
        for event in &room.ephemeral.events {
            if event.kind == "m.typing" {
                let content: TypingContent = parse_content(&event.content);
                actions.push(Action::Typing {
                    room: id.clone(),
                    users: content.user_ids,
                });
            }
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::update;
    use crate::test_support::test_app;
    use serde_json::json;

    fn response(value: Value) -> SyncResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_first_sync_registers_rooms_before_messages() {
        let mut store = SessionStore::default();
        let actions = apply_sync(
            &mut store,
            response(json!({
                "next_batch": "s1",
                "rooms": { "join": { "!a:example.org": {
                    "state": { "events": [
                        { "type": "m.room.name", "state_key": "", "sender": "@x:example.org",
                          "content": { "name": "Lounge" } }
                    ]},
                    "timeline": { "events": [
                        { "type": "m.room.message", "sender": "@bob:example.org",
                          "content": { "msgtype": "m.text", "body": "hi" } },
                        { "type": "m.reaction", "sender": "@bob:example.org", "content": {} }
                    ]},
                    "ephemeral": { "events": [
                        { "type": "m.typing", "content": { "user_ids": ["@bob:example.org"] } }
                    ]}
                }}}
            })),
        );

        assert_eq!(actions.len(), 3);
        match &actions[0] {
            Action::RoomListChanged { rooms, metadata } => {
                assert_eq!(rooms, &vec![RoomId::from("!a:example.org")]);
                assert_eq!(
                    metadata.get(&RoomId::from("!a:example.org")).and_then(|m| m.name.clone()),
                    Some("Lounge".to_string())
                );
            }
            other => panic!("expected RoomListChanged, got {other:?}"),
        }
        assert_eq!(
            actions[1],
            Action::Message {
                room: "!a:example.org".into(),
                sender: "@bob:example.org".into(),
                body: "hi".into(),
            }
        );
        assert_eq!(
            actions[2],
            Action::Typing {
                room: "!a:example.org".into(),
                users: vec!["@bob:example.org".into()],
            }
        );
        assert_eq!(store.next_batch.as_deref(), Some("s1"));
    }

    #[test]
    fn test_unchanged_room_set_emits_no_room_list() {
        let mut store = SessionStore::default();
        store.rooms.insert("!a".into(), RoomMetadata::default());
        let actions = apply_sync(
            &mut store,
            response(json!({
                "next_batch": "s2",
                "rooms": { "join": { "!a": {
                    "timeline": { "events": [
                        { "type": "m.room.topic", "state_key": "", "sender": "@x",
                          "content": { "topic": "Rust" } }
                    ]}
                }}}
            })),
        );
        assert_eq!(
            actions,
            vec![Action::RoomMetadataChanged {
                room: "!a".into(),
                metadata: RoomMetadata {
                    topic: Some("Rust".into()),
                    ..Default::default()
                },
            }]
        );
    }

    #[test]
    fn test_leave_removes_room() {
        let mut store = SessionStore::default();
        store.rooms.insert("!a".into(), RoomMetadata::default());
        store.rooms.insert("!b".into(), RoomMetadata::default());
        let actions = apply_sync(
            &mut store,
            response(json!({ "next_batch": "s3", "rooms": { "leave": { "!a": {} } } })),
        );
        assert!(matches!(
            actions.as_slice(),
            [Action::RoomListChanged { rooms, .. }] if rooms == &vec![RoomId::from("!b")]
        ));
    }

    fn named_join(id: &str, name: &str, batch: &str) -> SyncResponse {
        response(json!({
            "next_batch": batch,
            "rooms": { "join": { id: {
                "state": { "events": [
                    { "type": "m.room.name", "state_key": "", "sender": "@x",
                      "content": { "name": name } }
                ]}
            }}}
        }))
    }

    #[test]
    fn test_rejoined_room_shows_new_name() {
        let mut store = SessionStore::default();
        let mut app = test_app();

        let syncs = [
            named_join("!a", "Old", "s1"),
            response(json!({ "next_batch": "s2", "rooms": { "leave": { "!a": {} } } })),
            named_join("!a", "New", "s3"),
        ];
        for sync in syncs {
            for action in apply_sync(&mut store, sync) {
                update(&mut app, action);
            }
        }

        let room = RoomId::from("!a");
        assert_eq!(store.rooms[&room].name.as_deref(), Some("New"));
        assert_eq!(app.registry.len(), 1);
        assert_eq!(app.registry.view(&room).map(|v| v.display_name.as_str()), Some("New"));
    }

    #[test]
    fn test_apply_state_ignores_repeats_and_clears_empty() {
        let mut meta = RoomMetadata::default();
        assert!(apply_state(&mut meta, ALIAS_EVENT, &json!({ "alias": "#a:b" })));
        assert!(!apply_state(&mut meta, ALIAS_EVENT, &json!({ "alias": "#a:b" })));
        assert!(apply_state(&mut meta, ALIAS_EVENT, &json!({ "alias": "" })));
        assert!(meta.canonical_alias.is_none());
        assert!(!apply_state(&mut meta, "m.room.member", &json!({})));
    }

    #[test]
    fn test_empty_sync_only_advances_token() {
        let mut store = SessionStore::default();
        let actions = apply_sync(&mut store, response(json!({ "next_batch": "s9" })));
        assert!(actions.is_empty());
        assert_eq!(store.next_batch.as_deref(), Some("s9"));
    }
}
