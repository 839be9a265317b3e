//! Application state (Model in TEA pattern)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shipyard_core::prelude::*;
use shipyard_core::{
    can_edit, can_read, Config, ResourceId, ResourceKind, ResourceStatus, SaveError, User,
};

use crate::config::Settings;
use crate::draft::DraftOverlay;
use crate::editors::EditContext;
use crate::engine_event::EngineEvent;
use crate::history::UpdateHistory;
use crate::save::SaveTracker;
use crate::snapshot::SnapshotStore;

/// Application lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppPhase {
    /// No listing received yet
    #[default]
    Initializing,
    Running,
    Quitting,
}

/// Listing filter (kind, name query, tag)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResourceKind>,
    /// Case-insensitive substring of the resource name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// One row of the resource listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSummary {
    pub id: ResourceId,
    pub name: String,
    pub kind: ResourceKind,
    pub status: ResourceStatus,
    pub tags: Vec<String>,
    pub can_edit: bool,
    pub dirty: bool,
    pub conflict: bool,
    pub saving: bool,
}

/// Complete application state
#[derive(Debug)]
pub struct AppState {
    pub phase: AppPhase,

    /// Current signed-in user
    pub user: User,

    pub settings: Settings,

    /// Server-confirmed resources
    pub snapshots: SnapshotStore,

    /// Open working copies
    pub drafts: DraftOverlay,

    /// In-flight saves
    pub saves: SaveTracker,

    pub history: UpdateHistory,

    /// Whether a listing request is outstanding
    pub refreshing: bool,

    /// Most recent save failure per resource, cleared on success or reset
    pub save_errors: HashMap<ResourceId, SaveError>,

    /// Configs listed while a save was in flight, applied if that save fails
    pub(crate) deferred_configs: HashMap<ResourceId, Config>,

    pending_events: Vec<EngineEvent>,
}

impl AppState {
    pub fn new(user: User, settings: Settings) -> Self {
        Self {
            phase: AppPhase::Initializing,
            user,
            snapshots: SnapshotStore::new(),
            drafts: DraftOverlay::new(settings.editor.undo_limit),
            saves: SaveTracker::new(),
            history: UpdateHistory::new(settings.history.max_entries),
            refreshing: false,
            save_errors: HashMap::new(),
            deferred_configs: HashMap::new(),
            pending_events: Vec::new(),
            settings,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.phase == AppPhase::Quitting
    }

    /// No save or listing is outstanding
    pub fn is_idle(&self) -> bool {
        !self.refreshing && self.saves.in_flight_count() == 0
    }

    pub(crate) fn emit(&mut self, event: EngineEvent) {
        self.pending_events.push(event);
    }

    /// Drain events queued since the last call
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Permission gate for the current user, evaluated against current state
    pub fn can_edit(&self, id: &ResourceId) -> bool {
        self.snapshots
            .load(id)
            .map(|resource| can_edit(&self.user, resource))
            .unwrap_or(false)
    }

    pub fn is_dirty(&self, id: &ResourceId) -> bool {
        self.drafts.is_dirty(&self.snapshots, id)
    }

    pub fn has_conflict(&self, id: &ResourceId) -> bool {
        self.drafts.get(id).is_some_and(|draft| draft.has_conflict())
    }

    /// Editor context over the open draft for `id`
    pub fn edit_context(&self, id: &ResourceId) -> Result<EditContext<'_>> {
        let resource = self.snapshots.load(id)?;
        let draft = self.drafts.get(id).ok_or_else(|| Error::not_found(id))?;
        Ok(EditContext::new(&self.user, resource, draft.config()))
    }

    /// Resource listing, sorted by name
    ///
    /// Non-admin users only see resources they hold at least `Read` on.
    pub fn summaries(&self, filter: &ResourceFilter) -> Vec<ResourceSummary> {
        let query = filter
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        let mut rows: Vec<ResourceSummary> = self
            .snapshots
            .resources()
            .filter(|resource| can_read(&self.user, resource))
            .filter(|resource| filter.kind.map_or(true, |kind| resource.kind() == kind))
            .filter(|resource| {
                query
                    .as_ref()
                    .map_or(true, |q| resource.name.to_lowercase().contains(q))
            })
            .filter(|resource| {
                filter
                    .tag
                    .as_ref()
                    .map_or(true, |tag| resource.tags.iter().any(|t| t == tag))
            })
            .map(|resource| ResourceSummary {
                id: resource.id.clone(),
                name: resource.name.clone(),
                kind: resource.kind(),
                status: resource.status,
                tags: resource.tags.clone(),
                can_edit: can_edit(&self.user, resource),
                dirty: self.is_dirty(&resource.id),
                conflict: self.has_conflict(&resource.id),
                saving: self.saves.is_saving(&resource.id),
            })
            .collect();

        rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        rows
    }
}
