//! Handler module - TEA update function and message handlers
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `resources`: Listing and refresh handlers
//! - `edit`: Draft lifecycle and field edit handlers
//! - `save`: Save submission and completion handlers

pub(crate) mod edit;
pub(crate) mod resources;
pub(crate) mod save;
pub(crate) mod update;


use shipyard_core::User;

use crate::message::Message;
use crate::save::SaveTicket;

// Re-export main entry point
pub use update::update;

/// Actions that the event loop should perform after update
#[derive(Debug, Clone)]
pub enum UpdateAction {
    /// Fetch a full resource listing in the background
    FetchResources,

    /// Send a partial update to the control plane
    SubmitSave {
        ticket: SaveTicket,
        /// User the update is made on behalf of
        operator: User,
    },
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Optional follow-up message to process
    pub message: Option<Message>,
    /// Optional action for the event loop to perform
    pub action: Option<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            action: None,
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            action: Some(action),
        }
    }
}
