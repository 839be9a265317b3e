//! Draft lifecycle and field edit handlers
//!
//! Every refusal is reported as an `EditRejected` event. Path, index and
//! type errors mean an editor was wired to the wrong field; they are logged
//! at error level and flagged so callers can tell them from user mistakes.

use shipyard_core::prelude::*;
use shipyard_core::{EditOperation, FieldValue, ResourceId};

use crate::editors::{at, matching, ListField, NumberField, TextField, ToggleField};
use crate::engine_event::EngineEvent;
use crate::message::{FieldEdit, RowRef};
use crate::state::AppState;

use super::UpdateResult;

type Locator<'a> = Box<dyn FnOnce(&[FieldValue]) -> Option<usize> + 'a>;

pub fn handle_open_draft(state: &mut AppState, id: ResourceId) -> UpdateResult {
    if let Err(e) = state.open_draft(&id) {
        reject(state, id, &e);
    }
    UpdateResult::none()
}

pub fn handle_close_draft(state: &mut AppState, id: ResourceId, force: bool) -> UpdateResult {
    if let Err(e) = state.close_draft(&id, force) {
        reject(state, id, &e);
    }
    UpdateResult::none()
}

/// Turn an editor intent into an operation and apply it
pub fn handle_field_edit(state: &mut AppState, id: ResourceId, edit: FieldEdit) -> UpdateResult {
    if let Err(e) = apply_field_edit(state, &id, &edit) {
        reject(state, id, &e);
    }
    UpdateResult::none()
}

/// Apply an operation built outside the field editors
pub fn handle_apply_operation(
    state: &mut AppState,
    id: ResourceId,
    op: EditOperation,
) -> UpdateResult {
    debug!("{} {} on {}", op.label(), op.path(), id);
    let result = ensure_open(state, &id).and_then(|()| state.apply_edit(&id, &op));
    if let Err(e) = result {
        reject(state, id, &e);
    }
    UpdateResult::none()
}

pub fn handle_undo(state: &mut AppState, id: ResourceId) -> UpdateResult {
    match state.undo_edit(&id) {
        Ok(op) => debug!("Undo on {} applied {} {}", id, op.label(), op.path()),
        Err(e) => reject(state, id, &e),
    }
    UpdateResult::none()
}

pub fn handle_reset(state: &mut AppState, id: ResourceId) -> UpdateResult {
    match state.reset_draft(&id) {
        Ok(()) => info!("Draft for {} reset", id),
        Err(e) => reject(state, id, &e),
    }
    UpdateResult::none()
}

fn apply_field_edit(state: &mut AppState, id: &ResourceId, edit: &FieldEdit) -> Result<()> {
    ensure_open(state, id)?;
    let op = build_operation(state, id, edit)?;
    debug!("{} {} on {}", op.label(), op.path(), id);
    state.apply_edit(id, &op)
}

/// First edit opens the draft, unless the user could not edit it anyway
fn ensure_open(state: &mut AppState, id: &ResourceId) -> Result<()> {
    if !state.drafts.contains(id) {
        state.snapshots.load(id)?;
        if !state.can_edit(id) {
            return Err(Error::permission_denied(id));
        }
        state.open_draft(id)?;
    }
    Ok(())
}

fn locator(row: &RowRef) -> Locator<'_> {
    match row {
        RowRef::Index(index) => Box::new(at(*index)),
        RowRef::Matching(value) => Box::new(matching(value)),
    }
}

/// Resolve a [`FieldEdit`] against the draft as it is now
pub(crate) fn build_operation(
    state: &AppState,
    id: &ResourceId,
    edit: &FieldEdit,
) -> Result<EditOperation> {
    let ctx = state.edit_context(id)?;
    match edit {
        FieldEdit::SetText { path, value } => TextField::new(path.clone()).change(&ctx, value.as_str()),
        FieldEdit::SetNumber { path, value } => NumberField::new(path.clone()).set(&ctx, *value),
        FieldEdit::SetBool { path, value } => ToggleField::new(path.clone()).set(&ctx, *value),
        FieldEdit::Toggle { path } => ToggleField::new(path.clone()).toggle(&ctx),
        FieldEdit::Append { path } => ListField::bound(ctx.draft, path.clone())?.append(&ctx),
        FieldEdit::InsertBefore { path, row } => {
            ListField::bound(ctx.draft, path.clone())?.insert_before(&ctx, locator(row))
        }
        FieldEdit::Remove { path, row } => {
            ListField::bound(ctx.draft, path.clone())?.remove(&ctx, locator(row))
        }
        FieldEdit::SetRow { path, row, value } => {
            ListField::bound(ctx.draft, path.clone())?.set_row(&ctx, locator(row), value.clone())
        }
        FieldEdit::SetRowField {
            path,
            row,
            field,
            value,
        } => ListField::bound(ctx.draft, path.clone())?.set_subfield(
            &ctx,
            locator(row),
            field,
            value.as_str(),
        ),
    }
}

fn reject(state: &mut AppState, id: ResourceId, err: &Error) {
    let wiring = err.is_wiring_error();
    if wiring {
        error!("Editor wiring error on {}: {}", id, err);
    } else {
        warn!("Edit on {} rejected: {}", id, err);
    }
    state.emit(EngineEvent::EditRejected {
        id,
        reason: err.to_string(),
        wiring,
    });
}
