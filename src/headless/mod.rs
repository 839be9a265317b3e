//! Headless mode - NDJSON command/event stream
//!
//! Commands are read from stdin one JSON object per line; everything the
//! engine reports, plus the answers to query commands, is written to stdout
//! as NDJSON. This makes the editor scriptable and testable end to end.
//!
//! # Commands
//!
//! ```json
//! {"cmd":"open","id":"dep-web"}
//! {"cmd":"edit","id":"dep-web","action":"set_row_field","path":"ports","row":{"index":0},"field":"local","value":"443"}
//! {"cmd":"save","id":"dep-web"}
//! {"cmd":"wait"}
//! {"cmd":"show","id":"dep-web"}
//! ```
//!
//! `q`/`quit` and `r`/`refresh` are also accepted as bare words.
//!
//! # Example Output
//!
//! ```json
//! {"event":"draft_opened","id":"dep-web","revision":1,"timestamp":1704700001000}
//! {"event":"save_started","id":"dep-web","seq":1,"fields":["ports"],"timestamp":1704700002000}
//! {"event":"save_succeeded","id":"dep-web","revision":2,"kept_draft":false,"timestamp":1704700002010}
//! ```

pub mod runner;

use std::io::Write;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use shipyard_app::{EngineEvent, FieldEdit, ResourceFilter, ResourceSummary, UpdateRecord};
use shipyard_core::{Config, EditOperation, ResourceId, SaveError};

/// A command read from stdin
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Open {
        id: ResourceId,
    },
    Close {
        id: ResourceId,
        #[serde(default)]
        force: bool,
    },
    Edit {
        id: ResourceId,
        #[serde(flatten)]
        edit: FieldEdit,
    },
    /// Apply a raw edit operation
    Apply {
        id: ResourceId,
        op: EditOperation,
    },
    Undo {
        id: ResourceId,
    },
    Reset {
        id: ResourceId,
    },
    Save {
        id: ResourceId,
        #[serde(default)]
        force: bool,
    },
    Refresh,
    /// Switch the session user
    User {
        id: String,
        #[serde(default)]
        admin: bool,
    },
    List {
        #[serde(flatten)]
        filter: ResourceFilter,
    },
    Show {
        id: ResourceId,
    },
    History {
        #[serde(default)]
        id: Option<ResourceId>,
    },
    /// Block until no save or listing is outstanding
    Wait,
    Quit,
}

impl Command {
    /// Parse one input line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        match line.trim() {
            "" => Ok(None),
            "q" | "quit" => Ok(Some(Command::Quit)),
            "r" | "refresh" => Ok(Some(Command::Refresh)),
            json => serde_json::from_str(json)
                .map(Some)
                .map_err(|e| format!("Invalid command: {e}")),
        }
    }
}

/// Full view of one resource: snapshot, draft and editor flags
#[derive(Debug, Clone, Serialize)]
pub struct ResourceView {
    pub id: ResourceId,
    pub name: String,
    pub revision: u64,
    pub can_edit: bool,
    pub dirty: bool,
    pub conflict: bool,
    pub saving: bool,
    pub snapshot: Config,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<Config>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<SaveError>,
}

/// Lines written in headless mode besides engine events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Initial listing finished; commands are accepted from here on
    Ready {
        user: String,
        resources: usize,
        timestamp: i64,
    },

    /// Answer to `list`
    Resources {
        resources: Vec<ResourceSummary>,
        timestamp: i64,
    },

    /// Answer to `show`
    Resource {
        resource: ResourceView,
        timestamp: i64,
    },

    /// Answer to `history`
    History {
        records: Vec<UpdateRecord>,
        timestamp: i64,
    },

    /// Answer to `wait`
    Idle { timestamp: i64 },

    /// Error occurred
    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

/// An engine event with the headless timestamp attached
#[derive(Debug, Serialize)]
struct StampedEvent<'a> {
    #[serde(flatten)]
    event: &'a EngineEvent,
    timestamp: i64,
}

impl HeadlessEvent {
    /// Write this event as one NDJSON line
    pub fn emit_to<W: Write>(&self, out: &mut W) {
        write_line(out, self);
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn ready(user: &str, resources: usize) -> Self {
        Self::Ready {
            user: user.to_string(),
            resources,
            timestamp: Self::now(),
        }
    }

    pub fn resources(resources: Vec<ResourceSummary>) -> Self {
        Self::Resources {
            resources,
            timestamp: Self::now(),
        }
    }

    pub fn resource(resource: ResourceView) -> Self {
        Self::Resource {
            resource,
            timestamp: Self::now(),
        }
    }

    pub fn history(records: Vec<UpdateRecord>) -> Self {
        Self::History {
            records,
            timestamp: Self::now(),
        }
    }

    pub fn idle() -> Self {
        Self::Idle {
            timestamp: Self::now(),
        }
    }

    pub fn error(message: String, fatal: bool) -> Self {
        Self::Error {
            message,
            fatal,
            timestamp: Self::now(),
        }
    }
}

/// Write an engine event as one NDJSON line
pub fn emit_engine_event<W: Write>(out: &mut W, event: &EngineEvent) {
    write_line(
        out,
        &StampedEvent {
            event,
            timestamp: HeadlessEvent::now(),
        },
    );
}

fn write_line<W: Write, T: Serialize>(out: &mut W, value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize headless event: {}", e);
            return;
        }
    };

    if let Err(e) = writeln!(out, "{}", json) {
        error!("Failed to write headless event: {}", e);
        return;
    }

    // Flush to ensure immediate output
    if let Err(e) = out.flush() {
        error!("Failed to flush headless output: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipyard_app::RowRef;
    use shipyard_core::FieldPath;

    #[test]
    fn test_parse_bare_words() {
        assert_eq!(Command::parse("q").unwrap(), Some(Command::Quit));
        assert_eq!(Command::parse(" refresh ").unwrap(), Some(Command::Refresh));
        assert_eq!(Command::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_flattened_edit() {
        let cmd = Command::parse(
            r#"{"cmd":"edit","id":"dep-web","action":"remove","path":"ports","row":{"index":0}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            cmd,
            Command::Edit {
                id: "dep-web".into(),
                edit: FieldEdit::Remove {
                    path: FieldPath::field("ports"),
                    row: RowRef::Index(0),
                },
            }
        );
    }

    #[test]
    fn test_parse_list_filter() {
        let cmd = Command::parse(r#"{"cmd":"list","kind":"server"}"#)
            .unwrap()
            .unwrap();
        assert!(matches!(
            cmd,
            Command::List { filter } if filter.kind == Some(shipyard_core::ResourceKind::Server)
        ));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = Command::parse(r#"{"cmd":"launch"}"#).unwrap_err();
        assert!(err.starts_with("Invalid command"));
    }

    #[test]
    fn test_engine_event_gets_timestamp() {
        let mut out = Vec::new();
        emit_engine_event(&mut out, &EngineEvent::SaveSkipped { id: "dep-web".into() });

        let line: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(line["event"], "save_skipped");
        assert_eq!(line["id"], "dep-web");
        assert!(line["timestamp"].is_i64());
    }

    #[test]
    fn test_unit_engine_event_serializes() {
        let mut out = Vec::new();
        emit_engine_event(&mut out, &EngineEvent::Shutdown);
        let line: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(line["event"], "shutdown");
    }
}
