//! shipyard
//!
//! Configuration draft editor for deployment dashboards: edits are made on
//! local drafts layered over server-confirmed snapshots and committed as
//! partial updates.

// Module declarations
pub mod headless;

// Re-export main entry points
pub use headless::runner::{run_event_loop, run_headless};
