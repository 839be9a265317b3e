//! Message types for the application (TEA pattern)

use serde::{Deserialize, Serialize};
use shipyard_core::{EditOperation, FieldPath, FieldValue, Resource, ResourceId, SaveError, User};

use crate::save::SaveTicket;

/// How a list editor identifies the row it acts on.
///
/// Resolved against the draft's rows when the message is handled, never
/// when it was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowRef {
    /// Row at this position in the current list
    Index(usize),
    /// First row equal to this value
    Matching(FieldValue),
}

/// User intent captured by a field editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FieldEdit {
    SetText {
        path: FieldPath,
        value: String,
    },
    SetNumber {
        path: FieldPath,
        value: f64,
    },
    SetBool {
        path: FieldPath,
        value: bool,
    },
    Toggle {
        path: FieldPath,
    },
    /// Add an empty row at the end of a list
    Append {
        path: FieldPath,
    },
    /// Add an empty row before `row`
    InsertBefore {
        path: FieldPath,
        row: RowRef,
    },
    Remove {
        path: FieldPath,
        row: RowRef,
    },
    SetRow {
        path: FieldPath,
        row: RowRef,
        value: FieldValue,
    },
    /// Set a text sub-field such as `local` or `variable`
    SetRowField {
        path: FieldPath,
        row: RowRef,
        field: String,
        value: String,
    },
}

impl FieldEdit {
    pub fn path(&self) -> &FieldPath {
        match self {
            FieldEdit::SetText { path, .. }
            | FieldEdit::SetNumber { path, .. }
            | FieldEdit::SetBool { path, .. }
            | FieldEdit::Toggle { path }
            | FieldEdit::Append { path }
            | FieldEdit::InsertBefore { path, .. }
            | FieldEdit::Remove { path, .. }
            | FieldEdit::SetRow { path, .. }
            | FieldEdit::SetRowField { path, .. } => path,
        }
    }
}

/// All possible messages/actions in the application
#[derive(Debug, Clone)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Resource Loading
    // ─────────────────────────────────────────────────────────
    /// Request a full resource listing
    Refresh,

    /// A full listing arrived
    ResourcesLoaded { resources: Vec<Resource> },

    /// The listing request failed
    RefreshFailed { error: String },

    // ─────────────────────────────────────────────────────────
    // Draft Editing
    // ─────────────────────────────────────────────────────────
    /// Open (or keep) the draft for a resource
    OpenDraft { id: ResourceId },

    /// Drop the draft; `force` skips the unsaved-changes check
    CloseDraft { id: ResourceId, force: bool },

    /// Editor intent to turn into an edit operation
    Edit { id: ResourceId, edit: FieldEdit },

    /// Apply an already-built edit operation
    ApplyOperation { id: ResourceId, op: EditOperation },

    /// Revert the most recent edit
    Undo { id: ResourceId },

    /// Discard edits and reseed from the snapshot
    Reset { id: ResourceId },

    // ─────────────────────────────────────────────────────────
    // Saving
    // ─────────────────────────────────────────────────────────
    /// Submit the draft's changed keys; `force` overrides a conflict
    Save { id: ResourceId, force: bool },

    /// The control plane answered a save
    SaveCompleted {
        ticket: SaveTicket,
        result: Result<Resource, SaveError>,
    },

    // ─────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────
    /// The signed-in user changed
    SetUser { user: User },

    /// Request application exit
    Quit,
}
