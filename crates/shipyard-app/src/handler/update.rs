//! Main update function - handles state transitions (TEA pattern)

use tracing::info;

use crate::message::Message;
use crate::state::{AppPhase, AppState};

use super::{edit, resources, save, UpdateResult};

/// Process a message and update state
/// Returns optional follow-up message and/or action
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    match message {
        Message::Quit => {
            info!("Quit requested");
            state.phase = AppPhase::Quitting;
            UpdateResult::none()
        }

        // ─────────────────────────────────────────────────────────
        // Resource Loading
        // ─────────────────────────────────────────────────────────
        Message::Refresh => resources::handle_refresh(state),
        Message::ResourcesLoaded { resources } => {
            resources::handle_resources_loaded(state, resources)
        }
        Message::RefreshFailed { error } => resources::handle_refresh_failed(state, error),

        // ─────────────────────────────────────────────────────────
        // Draft Editing
        // ─────────────────────────────────────────────────────────
        Message::OpenDraft { id } => edit::handle_open_draft(state, id),
        Message::CloseDraft { id, force } => edit::handle_close_draft(state, id, force),
        Message::Edit { id, edit } => edit::handle_field_edit(state, id, edit),
        Message::ApplyOperation { id, op } => edit::handle_apply_operation(state, id, op),
        Message::Undo { id } => edit::handle_undo(state, id),
        Message::Reset { id } => edit::handle_reset(state, id),

        // ─────────────────────────────────────────────────────────
        // Saving
        // ─────────────────────────────────────────────────────────
        Message::Save { id, force } => save::handle_save(state, id, force),
        Message::SaveCompleted { ticket, result } => {
            save::handle_save_completed(state, ticket, result)
        }

        // ─────────────────────────────────────────────────────────
        // Session
        // ─────────────────────────────────────────────────────────
        Message::SetUser { user } => {
            state.set_user(user);
            UpdateResult::none()
        }
    }
}
