//! # shipyard-api - Control-Plane Client
//!
//! The editor core depends on the control plane only through [`ApiClient`]:
//! a bulk read returning full resources and a partial-update write that
//! returns the new authoritative resource.
//!
//! Depends on [`shipyard_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! - [`ApiClient`] / [`LocalApiClient`] - the collaborator contract
//! - [`MemoryApi`] - in-process control plane backed by a resource map
//! - [`Submission`] - a recorded partial-update request
//! - [`load_fixture()`] / [`demo_resources()`] - seed data for `MemoryApi`

pub mod fixture;
pub mod memory;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use fixture::{demo_resources, load_fixture, Fixture};
pub use memory::{InjectedFailure, MemoryApi, Submission};

use shipyard_core::prelude::*;
use shipyard_core::{PartialConfig, Resource, ResourceId, User};

/// Control-plane operations the editor relies on
#[trait_variant::make(ApiClient: Send)]
pub trait LocalApiClient {
    /// Read every resource visible to the control plane
    async fn list_resources(&self) -> Result<Vec<Resource>>;

    /// Read a single resource
    async fn get_resource(&self, id: &ResourceId) -> Result<Resource>;

    /// Apply a partial config on behalf of `operator` and return the
    /// resulting resource as the server stored it
    async fn update_config(
        &self,
        id: &ResourceId,
        partial: PartialConfig,
        operator: &User,
    ) -> Result<Resource>;
}
