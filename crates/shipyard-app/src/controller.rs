//! Diff & commit controller
//!
//! Operations that span the snapshot store, the draft overlay and the save
//! tracker. Per resource the draft moves through
//! `Clean -> Dirty -> (save ok) -> Clean`, stays `Dirty` on a failed save,
//! and picks up a conflict flag when the snapshot changes under unsaved
//! edits. A conflict is cleared by reset, by a (forced) save, or by editing
//! the draft back to the new snapshot.

use chrono::Utc;
use shipyard_core::prelude::*;
use shipyard_core::{can_edit, Config, EditOperation, Resource, ResourceId, SaveError, User};

use crate::engine_event::EngineEvent;
use crate::history::{UpdateOperation, UpdateRecord};
use crate::save::SaveTicket;
use crate::snapshot::SnapshotChange;
use crate::state::{AppPhase, AppState};

/// What a completed save did to the local state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Snapshot and draft both replaced by the server's config
    Synced { revision: u64 },
    /// Snapshot replaced; edits made during the save were kept
    KeptDraft { revision: u64 },
    /// Draft left untouched
    Failed,
}

impl AppState {
    // ─────────────────────────────────────────────────────────
    // Drafts
    // ─────────────────────────────────────────────────────────

    /// Open the draft for `id` (idempotent); returns its base revision
    pub fn open_draft(&mut self, id: &ResourceId) -> Result<u64> {
        let existed = self.drafts.contains(id);
        let revision = self.drafts.begin_edit(&self.snapshots, id)?.base_revision();
        if !existed {
            self.emit(EngineEvent::DraftOpened {
                id: id.clone(),
                revision,
            });
        }
        Ok(revision)
    }

    /// Apply an edit after checking the permission gate against current state
    pub fn apply_edit(&mut self, id: &ResourceId, op: &EditOperation) -> Result<()> {
        let resource = self.snapshots.load(id)?;
        if !can_edit(&self.user, resource) {
            return Err(Error::permission_denied(id));
        }
        self.drafts.apply(id, op)?;
        let dirty = self.settle_conflict(id);
        self.emit(EngineEvent::DraftChanged {
            id: id.clone(),
            operation: op.label().to_string(),
            path: op.path().to_string(),
            dirty,
        });
        Ok(())
    }

    /// Revert the most recent edit
    pub fn undo_edit(&mut self, id: &ResourceId) -> Result<EditOperation> {
        let resource = self.snapshots.load(id)?;
        if !can_edit(&self.user, resource) {
            return Err(Error::permission_denied(id));
        }
        let applied = self.drafts.undo(id)?;
        let dirty = self.settle_conflict(id);
        self.emit(EngineEvent::DraftChanged {
            id: id.clone(),
            operation: "undo".to_string(),
            path: applied.path().to_string(),
            dirty,
        });
        Ok(applied)
    }

    /// A conflict only exists on a dirty draft; returns the dirty flag
    fn settle_conflict(&mut self, id: &ResourceId) -> bool {
        let dirty = self.is_dirty(id);
        if !dirty && self.has_conflict(id) {
            if let Some(revision) = self.snapshots.revision(id) {
                debug!("Draft of {} matches r{} again; conflict cleared", id, revision);
                self.drafts.rebase(id, revision);
            }
        }
        dirty
    }

    /// Discard edits and reseed from the snapshot
    pub fn reset_draft(&mut self, id: &ResourceId) -> Result<()> {
        self.drafts.reset(&self.snapshots, id)?;
        self.save_errors.remove(id);
        self.emit(EngineEvent::DraftReset { id: id.clone() });
        Ok(())
    }

    /// Drop the draft. With `confirm_discard` on, a dirty draft is only
    /// dropped when `force` is set.
    pub fn close_draft(&mut self, id: &ResourceId, force: bool) -> Result<()> {
        let dirty = self.is_dirty(id);
        if dirty && !force && self.settings.editor.confirm_discard {
            return Err(Error::UnsavedChanges { id: id.to_string() });
        }
        if self.drafts.discard(id).is_some() {
            self.emit(EngineEvent::DraftClosed {
                id: id.clone(),
                dirty,
            });
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Saves
    // ─────────────────────────────────────────────────────────

    /// Compute the delta and reserve the save slot.
    ///
    /// Returns `Ok(None)` when there is nothing to send.
    pub fn prepare_save(&mut self, id: &ResourceId, force: bool) -> Result<Option<SaveTicket>> {
        let resource = self.snapshots.load(id)?;
        let Some(draft) = self.drafts.get(id) else {
            return Ok(None);
        };
        if self.saves.is_saving(id) {
            return Err(Error::SaveInFlight { id: id.to_string() });
        }
        if !can_edit(&self.user, resource) {
            return Err(Error::PermissionRevoked { id: id.to_string() });
        }

        let partial = draft.config().diff(&resource.config)?;
        let generation = draft.generation();
        let conflict = draft.has_conflict();
        if partial.is_empty() {
            if let Some(revision) = self.snapshots.revision(id) {
                self.drafts.rebase(id, revision);
            }
            return Ok(None);
        }
        if conflict && !force {
            return Err(Error::SaveConflict { id: id.to_string() });
        }

        let ticket = self.saves.begin(id, generation, partial, force)?;
        self.save_errors.remove(id);
        Ok(Some(ticket))
    }

    /// Apply the server's answer to a save
    pub fn complete_save(
        &mut self,
        ticket: &SaveTicket,
        result: std::result::Result<Resource, SaveError>,
    ) -> SaveOutcome {
        let id = &ticket.resource_id;
        if !self.saves.finish(ticket) {
            warn!("Completion for save #{} of {} did not own the slot", ticket.seq, id);
        }
        let deferred = self.deferred_configs.remove(id);

        self.history.record(UpdateRecord {
            resource_id: id.clone(),
            operation: UpdateOperation::UpdateConfig,
            fields: ticket.fields().into_iter().map(String::from).collect(),
            operator: self.user.id.clone(),
            ts: Utc::now(),
            success: result.is_ok(),
            error: result.as_ref().err().map(|e| e.message.clone()),
        });

        match result {
            Ok(resource) => {
                self.snapshots.on_external_update(resource);
                let revision = self.snapshots.revision(id).unwrap_or_default();
                let kept = self
                    .drafts
                    .get(id)
                    .is_some_and(|draft| draft.generation() != ticket.generation);

                if kept {
                    self.drafts.rebase(id, revision);
                } else if let Ok(resource) = self.snapshots.load(id) {
                    let config = resource.config.clone();
                    self.drafts.resync(id, config, revision);
                }
                self.save_errors.remove(id);

                info!("Saved {} r{} ({:?})", id, revision, ticket.fields());
                self.emit(EngineEvent::SaveSucceeded {
                    id: id.clone(),
                    revision,
                    kept_draft: kept,
                });
                if kept {
                    SaveOutcome::KeptDraft { revision }
                } else {
                    SaveOutcome::Synced { revision }
                }
            }
            Err(error) => {
                warn!(
                    "Save of {} failed ({}): {}",
                    id,
                    if error.is_retryable() { "retryable" } else { "needs changes" },
                    error
                );
                self.save_errors.insert(id.clone(), error.clone());
                self.emit(EngineEvent::SaveFailed {
                    id: id.clone(),
                    error,
                });
                if let Some(config) = deferred {
                    self.apply_deferred_config(id, config);
                }
                SaveOutcome::Failed
            }
        }
    }

    // ─────────────────────────────────────────────────────────
    // Snapshot updates
    // ─────────────────────────────────────────────────────────

    /// Apply a full listing from the control plane
    pub fn apply_listing(&mut self, resources: Vec<Resource>) {
        let listed: Vec<ResourceId> = resources.iter().map(|r| r.id.clone()).collect();
        for resource in resources {
            self.apply_external_update(resource);
        }

        let removed = self.snapshots.retain_listed(&listed);
        for id in &removed {
            self.deferred_configs.remove(id);
            if self.drafts.discard(id).is_some() {
                warn!("Resource {} disappeared; draft dropped", id);
            }
            self.save_errors.remove(id);
        }

        self.refreshing = false;
        if self.phase == AppPhase::Initializing {
            self.phase = AppPhase::Running;
        }
        self.emit(EngineEvent::ResourcesLoaded {
            count: listed.len(),
            removed,
        });
    }

    /// Overwrite one snapshot entry and reconcile the draft with it
    pub fn apply_external_update(&mut self, mut resource: Resource) {
        let id = resource.id.clone();

        // the pending save response is authoritative for the config; the
        // listed one is held back in case the save fails
        if self.saves.is_saving(&id) {
            if let Ok(current) = self.snapshots.load(&id) {
                if current.config != resource.config {
                    debug!("Deferring config refresh of {} until its save completes", id);
                    let listed = std::mem::replace(&mut resource.config, current.config.clone());
                    self.deferred_configs.insert(id.clone(), listed);
                } else {
                    self.deferred_configs.remove(&id);
                }
            }
        }

        let was_dirty = self.is_dirty(&id);
        let could_edit = self.snapshots.contains(&id).then(|| self.can_edit(&id));

        let change = self.snapshots.on_external_update(resource);
        let revision = self.snapshots.revision(&id).unwrap_or_default();

        if change.config_changed() && self.drafts.contains(&id) {
            let confirmed = self.snapshots.load(&id).map(|r| r.config.clone());
            if let Ok(confirmed) = confirmed {
                let draft_matches = self
                    .drafts
                    .get(&id)
                    .is_some_and(|draft| draft.config() == &confirmed);
                if !was_dirty {
                    self.drafts.resync(&id, confirmed, revision);
                    self.emit(EngineEvent::DraftResynced {
                        id: id.clone(),
                        revision,
                    });
                } else if draft_matches {
                    self.drafts.rebase(&id, revision);
                } else {
                    warn!("Snapshot of {} changed under unsaved edits", id);
                    self.drafts.mark_conflict(&id);
                    self.emit(EngineEvent::ConflictDetected { id: id.clone() });
                }
            }
        }

        if change != SnapshotChange::Unchanged {
            self.emit(EngineEvent::SnapshotUpdated {
                id: id.clone(),
                revision,
            });
        }

        let can_now = self.can_edit(&id);
        if could_edit.is_some_and(|before| before != can_now) {
            info!("Edit permission on {} is now {}", id, can_now);
            self.emit(EngineEvent::PermissionChanged {
                id,
                can_edit: can_now,
            });
        }
    }

    /// Apply a config listed while a save was in flight that then failed
    fn apply_deferred_config(&mut self, id: &ResourceId, config: Config) {
        let Ok(current) = self.snapshots.load(id) else {
            return;
        };
        debug!("Applying config of {} listed during the failed save", id);
        let mut resource = current.clone();
        resource.config = config;
        self.apply_external_update(resource);
    }

    /// Switch the signed-in user; permission is re-evaluated from scratch
    pub fn set_user(&mut self, user: User) {
        info!("User changed: {} -> {}", self.user.id, user.id);
        self.emit(EngineEvent::UserChanged {
            user_id: user.id.clone(),
        });
        self.user = user;
    }
}
