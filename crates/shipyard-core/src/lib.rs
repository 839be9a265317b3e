//! # shipyard-core - Resource Domain Types
//!
//! Foundation crate for shipyard. Provides the resource model, the closed
//! per-kind config variants, field paths, edit operations, partial configs,
//! the permission gate, error handling and logging setup.
//!
//! This crate has **no internal dependencies**.
//!
//! ## Public API
//!
//! ### Resources (`types`)
//! - [`Resource`] - id, name, tags, permissions, status and config
//! - [`ResourceId`], [`ResourceKind`], [`ResourceStatus`]
//! - [`User`], [`PermissionLevel`]
//!
//! ### Configs (`config`, `partial`)
//! - [`Config`] - `Deployment | Server | Builder` tagged union
//! - [`PartialConfig`] - changed top-level keys, produced by [`Config::diff`]
//!
//! ### Editing (`path`, `edit`)
//! - [`FieldPath`] - `ports[1].local` style addresses
//! - [`FieldValue`] - typed values emitted by field editors
//! - [`EditOperation`] - `SetField`, `InsertAt`, `RemoveAt`; `apply` returns the inverse
//!
//! ### Permission Gate (`permission`)
//! - [`can_edit()`], [`can_read()`]
//!
//! ### Error Handling (`error`)
//! - [`Error`] - error enum with `fatal` vs `recoverable` classification
//! - [`SaveError`] - cloneable save failure carried through messages
//! - [`Result`], [`ResultExt`]
//!
//! ## Prelude
//!
//! ```rust
//! use shipyard_core::prelude::*;
//! ```

pub mod config;
pub mod edit;
pub mod error;
pub mod logging;
pub mod partial;
pub mod path;
pub mod permission;
pub mod types;

/// Prelude for common imports used throughout all shipyard crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use config::{
    BuilderConfig, Config, DeploymentConfig, EnvVar, ListElement, PortMapping, RestartMode,
    ServerConfig, VolumeMount,
};
pub use edit::{EditOperation, FieldValue};
pub use error::{Error, Result, ResultExt, SaveError, SaveErrorKind};
pub use partial::{BuilderPartial, DeploymentPartial, PartialConfig, ServerPartial};
pub use path::{FieldPath, PathSegment};
pub use permission::{can_edit, can_read};
pub use types::{
    PermissionLevel, PermissionsMap, Resource, ResourceId, ResourceKind, ResourceStatus, User,
};
