//! Save handlers

use shipyard_core::{Resource, ResourceId, SaveError};
use tracing::{info, warn};

use crate::engine_event::EngineEvent;
use crate::save::SaveTicket;
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

/// Compute the delta and hand it to the event loop for submission
pub fn handle_save(state: &mut AppState, id: ResourceId, force: bool) -> UpdateResult {
    match state.prepare_save(&id, force) {
        Ok(Some(ticket)) => {
            let fields: Vec<String> = ticket.fields().into_iter().map(String::from).collect();
            info!(
                "Saving {} (#{}, fields: {}{})",
                id,
                ticket.seq,
                fields.join(", "),
                if ticket.forced { ", forced" } else { "" }
            );
            state.emit(EngineEvent::SaveStarted {
                id,
                seq: ticket.seq,
                fields,
            });
            UpdateResult::action(UpdateAction::SubmitSave {
                ticket,
                operator: state.user.clone(),
            })
        }
        Ok(None) => {
            info!("Nothing to save for {}", id);
            state.emit(EngineEvent::SaveSkipped { id });
            UpdateResult::none()
        }
        Err(e) => {
            warn!("Save of {} refused: {}", id, e);
            state.emit(EngineEvent::SaveFailed {
                id,
                error: SaveError::from(&e),
            });
            UpdateResult::none()
        }
    }
}

pub fn handle_save_completed(
    state: &mut AppState,
    ticket: SaveTicket,
    result: Result<Resource, SaveError>,
) -> UpdateResult {
    state.complete_save(&ticket, result);
    UpdateResult::none()
}
