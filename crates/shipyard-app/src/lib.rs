//! shipyard-app - Editor state and orchestration for shipyard
//!
//! This crate implements the TEA (The Elm Architecture) pattern for the
//! configuration draft editor: the snapshot store of server-confirmed
//! resources, the draft overlay of working copies, field editors, the diff
//! and commit controller, and the Engine that drives them against an
//! [`ApiClient`](shipyard_api::ApiClient).

pub mod actions;
pub mod config;
pub mod controller;
pub mod draft;
pub mod editors;
pub mod engine;
pub mod engine_event;
pub mod handler;
pub mod history;
pub mod message;
pub mod process;
pub mod save;
pub mod snapshot;
pub mod state;

// Re-export primary types
pub use controller::SaveOutcome;
pub use draft::{Draft, DraftOverlay};
pub use editors::{EditContext, ListField, NumberField, TextField, ToggleField};
pub use engine::Engine;
pub use engine_event::EngineEvent;
pub use handler::{UpdateAction, UpdateResult};
pub use history::{UpdateHistory, UpdateOperation, UpdateRecord};
pub use message::{FieldEdit, Message, RowRef};
pub use save::{SaveTicket, SaveTracker};
pub use snapshot::{SnapshotChange, SnapshotEntry, SnapshotStore};
pub use state::{AppPhase, AppState, ResourceFilter, ResourceSummary};
