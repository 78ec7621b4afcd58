//! # Command Router
//!
//! Turns a submitted input line into either a message for the current room
//! or a slash-command.
//!
//! ```text
//! ""                  → nothing
//! "/join #room:host"  → Effect::Request(Join { .. })
//! "/quit"             → Effect::Quit
//! "hello"             → Effect::Request(SendMessage { .. })
//! ```
//!
//! Unknown commands are ignored. Malformed invocations write a usage line
//! into the current room's log instead of running.

use log::{debug, warn};

use crate::core::action::{Effect, SessionRequest};
use crate::core::registry::RoomRegistry;

/// Sender shown on locally generated lines.
pub const SYSTEM_SENDER: &str = "*";

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput<'a> {
    Empty,
    Message(&'a str),
    Command(Command),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    ClearCache,
    /// `/leave` or `/part`
    Leave,
    /// `/join`, with the argument if one was given
    Join(Option<String>),
    Unknown(String),
}

/// Split a line at its first whitespace run. The command name is lowercased;
/// the rest is kept as one trimmed argument.
pub fn parse(line: &str) -> ParsedInput<'_> {
    if line.is_empty() {
        return ParsedInput::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ParsedInput::Message(line);
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    let args = (!args.is_empty()).then(|| args.to_string());

    let command = match name.to_lowercase().as_str() {
        "quit" => Command::Quit,
        "clearcache" => Command::ClearCache,
        "leave" | "part" => Command::Leave,
        "join" => Command::Join(args),
        other => Command::Unknown(other.to_string()),
    };
    ParsedInput::Command(command)
}

/// The part of a room identifier after its first `:`, if any.
pub fn server_hint(identifier: &str) -> Option<&str> {
    identifier
        .split_once(':')
        .map(|(_, server)| server)
        .filter(|server| !server.is_empty())
}

/// Decide what a submitted line does.
pub fn route(registry: &mut RoomRegistry, line: &str) -> Effect {
    let current = registry.current().cloned();
    match parse(line) {
        ParsedInput::Empty => Effect::None,
        ParsedInput::Message(body) => match current {
            Some(room) => Effect::Request(SessionRequest::SendMessage {
                room,
                body: body.to_string(),
            }),
            None => {
                warn!("No room selected, dropping message");
                Effect::None
            }
        },
        ParsedInput::Command(command) => {
            debug!("Handling command {:?}", command);
            match command {
                Command::Quit => Effect::Quit,
                Command::ClearCache => Effect::ClearCacheAndQuit,
                Command::Leave => match current {
                    Some(room) => Effect::Request(SessionRequest::Leave { room }),
                    None => Effect::None,
                },
                Command::Join(None) => {
                    if let Some(room) = current {
                        registry.append_message(&room, SYSTEM_SENDER, "Usage: /join <room>");
                    }
                    Effect::Render
                }
                Command::Join(Some(identifier)) => {
                    let server_hint = server_hint(&identifier).map(String::from);
                    Effect::Request(SessionRequest::Join {
                        identifier,
                        server_hint,
                    })
                }
                Command::Unknown(name) => {
                    debug!("Ignoring unknown command /{}", name);
                    Effect::None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::room::RoomId;

    fn registry() -> RoomRegistry {
        let mut registry = RoomRegistry::new();
        registry.set_rooms(vec![RoomId::from("!a"), RoomId::from("!b")], |_| None);
        registry
    }

    #[test]
    fn test_parse_splits_on_first_whitespace_run() {
        assert_eq!(parse(""), ParsedInput::Empty);
        assert_eq!(parse("hi /there"), ParsedInput::Message("hi /there"));
        assert_eq!(
            parse("/JOIN   #rust:example.org  "),
            ParsedInput::Command(Command::Join(Some("#rust:example.org".into())))
        );
        assert_eq!(parse("/Quit"), ParsedInput::Command(Command::Quit));
        assert_eq!(parse("/join   "), ParsedInput::Command(Command::Join(None)));
    }

    #[test]
    fn test_part_is_leave() {
        assert_eq!(parse("/part"), ParsedInput::Command(Command::Leave));
        assert_eq!(parse("/leave"), ParsedInput::Command(Command::Leave));

        let mut registry = registry();
        registry.switch_to(1);
        assert_eq!(
            route(&mut registry, "/part"),
            Effect::Request(SessionRequest::Leave { room: "!b".into() })
        );
    }

    #[test]
    fn test_join_derives_server_hint() {
        let mut registry = registry();
        assert_eq!(
            route(&mut registry, "/join !foo:example.org"),
            Effect::Request(SessionRequest::Join {
                identifier: "!foo:example.org".into(),
                server_hint: Some("example.org".into()),
            })
        );
    }

    #[test]
    fn test_server_hint_keeps_everything_after_first_colon() {
        assert_eq!(server_hint("#room:example.org:8448"), Some("example.org:8448"));
        assert_eq!(server_hint("#room"), None);
        assert_eq!(server_hint("#room:"), None);
    }

    #[test]
    fn test_join_without_argument_writes_usage() {
        let mut registry = registry();
        let effect = route(&mut registry, "/join");
        assert_eq!(effect, Effect::Render);

        let log = registry.current_view().map(|v| v.messages().to_vec()).unwrap_or_default();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].sender, SYSTEM_SENDER);
        assert_eq!(log[0].body, "Usage: /join <room>");
        // The other room is untouched
        assert_eq!(registry.view(&"!b".into()).map(|v| v.messages().len()), Some(0));
    }

    #[test]
    fn test_plain_text_is_sent_to_current_room() {
        let mut registry = registry();
        assert_eq!(
            route(&mut registry, "hello world"),
            Effect::Request(SessionRequest::SendMessage {
                room: "!a".into(),
                body: "hello world".into(),
            })
        );
    }

    #[test]
    fn test_quit_and_clearcache() {
        let mut registry = registry();
        assert_eq!(route(&mut registry, "/quit"), Effect::Quit);
        assert_eq!(route(&mut registry, "/clearcache"), Effect::ClearCacheAndQuit);
    }

    #[test]
    fn test_unknown_and_empty_are_ignored() {
        let mut registry = registry();
        assert_eq!(route(&mut registry, "/frobnicate now"), Effect::None);
        assert_eq!(route(&mut registry, ""), Effect::None);
        assert!(registry.rooms().all(|(_, view)| view.messages().is_empty()));
    }

    #[test]
    fn test_no_room_selected() {
        let mut registry = RoomRegistry::new();
        assert_eq!(route(&mut registry, "hello"), Effect::None);
        assert_eq!(route(&mut registry, "/leave"), Effect::None);
        assert_eq!(route(&mut registry, "/join"), Effect::Render);
        assert!(matches!(
            route(&mut registry, "/join #a:b"),
            Effect::Request(SessionRequest::Join { .. })
        ));
    }
}
