//! Draft overlay - per-resource working copies
//!
//! A draft is seeded as a deep copy of the snapshot and diverges only through
//! [`EditOperation`]s. Each applied operation pushes its inverse onto a
//! bounded undo stack.

use std::collections::{HashMap, VecDeque};

use shipyard_core::prelude::*;
use shipyard_core::{Config, EditOperation, ResourceId};

use crate::snapshot::SnapshotStore;

/// Working copy of one resource's config
#[derive(Debug, Clone)]
pub struct Draft {
    config: Config,
    /// Snapshot revision this draft was seeded from or last rebased onto
    base_revision: u64,
    /// Unique across every draft of the process; advances on each apply,
    /// undo or resync
    generation: u64,
    undo: VecDeque<EditOperation>,
    conflict: bool,
}

impl Draft {
    fn seeded(config: Config, revision: u64, generation: u64) -> Self {
        Self {
            config,
            base_revision: revision,
            generation,
            undo: VecDeque::new(),
            conflict: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base_revision(&self) -> u64 {
        self.base_revision
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// The snapshot changed underneath unsaved edits
    pub fn has_conflict(&self) -> bool {
        self.conflict
    }
}

/// All open drafts, keyed by resource
#[derive(Debug)]
pub struct DraftOverlay {
    drafts: HashMap<ResourceId, Draft>,
    undo_limit: usize,
    /// Last generation handed out
    generations: u64,
}

impl DraftOverlay {
    pub fn new(undo_limit: usize) -> Self {
        Self {
            drafts: HashMap::new(),
            undo_limit,
            generations: 0,
        }
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Draft> {
        self.drafts.get(id)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.drafts.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.drafts.keys()
    }

    /// Open a draft seeded from the snapshot. Idempotent: an existing draft
    /// is returned as is.
    pub fn begin_edit(&mut self, snapshots: &SnapshotStore, id: &ResourceId) -> Result<&Draft> {
        if !self.drafts.contains_key(id) {
            let entry = snapshots.entry(id).ok_or_else(|| Error::not_found(id))?;
            debug!("draft opened: {} at r{}", id, entry.revision);
            self.generations += 1;
            self.drafts.insert(
                id.clone(),
                Draft::seeded(entry.resource.config.clone(), entry.revision, self.generations),
            );
        }
        self.drafts.get(id).ok_or_else(|| Error::not_found(id))
    }

    /// Apply `op` to the draft for `id`. On error the draft is unchanged.
    pub fn apply(&mut self, id: &ResourceId, op: &EditOperation) -> Result<()> {
        let undo_limit = self.undo_limit;
        let draft = self.drafts.get_mut(id).ok_or_else(|| Error::not_found(id))?;
        let inverse = op.apply(&mut draft.config)?;
        self.generations += 1;
        draft.generation = self.generations;
        if undo_limit > 0 {
            if draft.undo.len() == undo_limit {
                draft.undo.pop_front();
            }
            draft.undo.push_back(inverse);
        }
        Ok(())
    }

    /// Revert the most recent operation, returning the inverse that was applied
    pub fn undo(&mut self, id: &ResourceId) -> Result<EditOperation> {
        let draft = self.drafts.get_mut(id).ok_or_else(|| Error::not_found(id))?;
        let inverse = draft
            .undo
            .pop_back()
            .ok_or_else(|| Error::NothingToUndo { id: id.to_string() })?;
        if let Err(e) = inverse.apply(&mut draft.config) {
            // inverses are exact, so this only happens if the stack was corrupted
            draft.undo.clear();
            return Err(e);
        }
        self.generations += 1;
        draft.generation = self.generations;
        Ok(inverse)
    }

    /// Drop the draft; the next `begin_edit` reseeds from the snapshot
    pub fn discard(&mut self, id: &ResourceId) -> Option<Draft> {
        let dropped = self.drafts.remove(id);
        if dropped.is_some() {
            debug!("draft discarded: {}", id);
        }
        dropped
    }

    /// Discard and reseed from the current snapshot
    pub fn reset(&mut self, snapshots: &SnapshotStore, id: &ResourceId) -> Result<&Draft> {
        self.discard(id);
        self.begin_edit(snapshots, id)
    }

    /// Replace the draft with a confirmed config, clearing undo and conflict
    pub fn resync(&mut self, id: &ResourceId, config: Config, revision: u64) {
        if let Some(draft) = self.drafts.get_mut(id) {
            self.generations += 1;
            *draft = Draft::seeded(config, revision, self.generations);
        }
    }

    /// Keep the draft's edits but move its base to a new snapshot revision
    pub fn rebase(&mut self, id: &ResourceId, revision: u64) {
        if let Some(draft) = self.drafts.get_mut(id) {
            draft.base_revision = revision;
            draft.conflict = false;
        }
    }

    pub fn mark_conflict(&mut self, id: &ResourceId) {
        if let Some(draft) = self.drafts.get_mut(id) {
            draft.conflict = true;
        }
    }

    /// Structural inequality between draft and snapshot, recomputed on each call
    pub fn is_dirty(&self, snapshots: &SnapshotStore, id: &ResourceId) -> bool {
        match (self.drafts.get(id), snapshots.load(id)) {
            (Some(draft), Ok(resource)) => draft.config != resource.config,
            _ => false,
        }
    }
}
