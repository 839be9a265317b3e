//! Resource listing handlers

use shipyard_core::Resource;
use tracing::{debug, warn};

use crate::engine_event::EngineEvent;
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

/// Start a listing unless one is already outstanding
pub fn handle_refresh(state: &mut AppState) -> UpdateResult {
    if state.refreshing {
        debug!("Refresh already in progress");
        return UpdateResult::none();
    }
    state.refreshing = true;
    UpdateResult::action(UpdateAction::FetchResources)
}

pub fn handle_resources_loaded(state: &mut AppState, resources: Vec<Resource>) -> UpdateResult {
    debug!("Listing returned {} resources", resources.len());
    state.apply_listing(resources);
    UpdateResult::none()
}

/// Keep the current snapshots and report the failure
pub fn handle_refresh_failed(state: &mut AppState, error: String) -> UpdateResult {
    warn!("Resource listing failed: {}", error);
    state.refreshing = false;
    state.emit(EngineEvent::RefreshFailed { error });
    UpdateResult::none()
}
