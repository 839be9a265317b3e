//! Domain events emitted by the Engine for external consumers
//!
//! Handlers queue events on the state while processing a message; the
//! Engine broadcasts them once the message (and its follow-ups) settle, so
//! subscribers always see a consistent view.

use serde::Serialize;
use shipyard_core::{ResourceId, SaveError};

/// Change notifications for re-render triggers and the headless stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    // ─────────────────────────────────────────────────────────
    // Snapshots
    // ─────────────────────────────────────────────────────────
    /// A full listing was applied
    ResourcesLoaded {
        count: usize,
        removed: Vec<ResourceId>,
    },

    /// A snapshot entry was written
    SnapshotUpdated { id: ResourceId, revision: u64 },

    /// Listing failed; existing snapshots are kept
    RefreshFailed { error: String },

    /// The current user's edit right on a resource flipped
    PermissionChanged { id: ResourceId, can_edit: bool },

    // ─────────────────────────────────────────────────────────
    // Drafts
    // ─────────────────────────────────────────────────────────
    DraftOpened { id: ResourceId, revision: u64 },

    /// Draft dropped; `dirty` reports whether unsaved edits were discarded
    DraftClosed { id: ResourceId, dirty: bool },

    /// An edit (or undo) was applied
    DraftChanged {
        id: ResourceId,
        operation: String,
        path: String,
        dirty: bool,
    },

    /// An edit was refused; `wiring` marks editor bugs rather than user errors
    EditRejected {
        id: ResourceId,
        reason: String,
        wiring: bool,
    },

    DraftReset { id: ResourceId },

    /// A clean draft followed an external snapshot change
    DraftResynced { id: ResourceId, revision: u64 },

    /// The snapshot changed underneath unsaved edits
    ConflictDetected { id: ResourceId },

    // ─────────────────────────────────────────────────────────
    // Saves
    // ─────────────────────────────────────────────────────────
    SaveStarted {
        id: ResourceId,
        seq: u64,
        fields: Vec<String>,
    },

    /// Nothing changed, so nothing was sent
    SaveSkipped { id: ResourceId },

    /// `kept_draft` is set when edits made during the save were preserved
    SaveSucceeded {
        id: ResourceId,
        revision: u64,
        kept_draft: bool,
    },

    SaveFailed { id: ResourceId, error: SaveError },

    // ─────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────
    UserChanged { user_id: String },

    /// Engine is shutting down
    Shutdown,
}

impl EngineEvent {
    /// Returns a short string label for this event type (for logging/debugging).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ResourcesLoaded { .. } => "resources_loaded",
            Self::SnapshotUpdated { .. } => "snapshot_updated",
            Self::RefreshFailed { .. } => "refresh_failed",
            Self::PermissionChanged { .. } => "permission_changed",
            Self::DraftOpened { .. } => "draft_opened",
            Self::DraftClosed { .. } => "draft_closed",
            Self::DraftChanged { .. } => "draft_changed",
            Self::EditRejected { .. } => "edit_rejected",
            Self::DraftReset { .. } => "draft_reset",
            Self::DraftResynced { .. } => "draft_resynced",
            Self::ConflictDetected { .. } => "conflict_detected",
            Self::SaveStarted { .. } => "save_started",
            Self::SaveSkipped { .. } => "save_skipped",
            Self::SaveSucceeded { .. } => "save_succeeded",
            Self::SaveFailed { .. } => "save_failed",
            Self::UserChanged { .. } => "user_changed",
            Self::Shutdown => "shutdown",
        }
    }

    /// Resource the event concerns, if any
    pub fn resource_id(&self) -> Option<&ResourceId> {
        match self {
            Self::SnapshotUpdated { id, .. }
            | Self::PermissionChanged { id, .. }
            | Self::DraftOpened { id, .. }
            | Self::DraftClosed { id, .. }
            | Self::DraftChanged { id, .. }
            | Self::EditRejected { id, .. }
            | Self::DraftReset { id }
            | Self::DraftResynced { id, .. }
            | Self::ConflictDetected { id }
            | Self::SaveStarted { id, .. }
            | Self::SaveSkipped { id }
            | Self::SaveSucceeded { id, .. }
            | Self::SaveFailed { id, .. } => Some(id),
            Self::ResourcesLoaded { .. }
            | Self::RefreshFailed { .. }
            | Self::UserChanged { .. }
            | Self::Shutdown => None,
        }
    }
}
