//! Resource domain types
//!
//! Defines:
//! - `ResourceId` / `ResourceKind` - identity of a manageable entity
//! - `Resource` - a deployment, server or builder as returned by the API
//! - `User` / `PermissionLevel` - the inputs to the permission gate

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Opaque resource identifier assigned by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of manageable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Deployment,
    Server,
    Builder,
}

impl ResourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Deployment => "deployment",
            ResourceKind::Server => "server",
            ResourceKind::Builder => "builder",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Runtime status summary reported alongside a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Deployment container is running
    Running,
    /// Deployment container exited
    Exited,
    /// Deployment has never been deployed
    NotDeployed,
    /// Server or builder is reachable
    Healthy,
    /// Server or builder did not respond
    Unreachable,
    /// Server disabled by an operator
    Disabled,
    #[default]
    Unknown,
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceStatus::Running => "running",
            ResourceStatus::Exited => "exited",
            ResourceStatus::NotDeployed => "not deployed",
            ResourceStatus::Healthy => "healthy",
            ResourceStatus::Unreachable => "unreachable",
            ResourceStatus::Disabled => "disabled",
            ResourceStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Permission level a user holds on a resource. Ordered: `None < Read < Execute < Update`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    #[default]
    None,
    Read,
    Execute,
    Update,
}

/// Map of user id to permission level
pub type PermissionsMap = HashMap<String, PermissionLevel>;

/// Identity of the user operating the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub admin: bool,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            admin: false,
        }
    }

    pub fn admin(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            admin: true,
            ..Self::new(id, username)
        }
    }
}

/// A manageable entity with its full, server-confirmed configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub permissions: PermissionsMap,
    #[serde(default)]
    pub status: ResourceStatus,
    pub config: Config,
}

impl Resource {
    pub fn new(id: impl Into<ResourceId>, name: impl Into<String>, config: Config) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tags: Vec::new(),
            permissions: PermissionsMap::new(),
            status: ResourceStatus::Unknown,
            config,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.config.kind()
    }

    /// Permission level the given user holds on this resource
    pub fn permission_for(&self, user_id: &str) -> PermissionLevel {
        self.permissions.get(user_id).copied().unwrap_or_default()
    }

    pub fn with_permission(mut self, user_id: impl Into<String>, level: PermissionLevel) -> Self {
        self.permissions.insert(user_id.into(), level);
        self
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeploymentConfig;

    #[test]
    fn test_permission_level_ordering() {
        assert!(PermissionLevel::None < PermissionLevel::Read);
        assert!(PermissionLevel::Read < PermissionLevel::Execute);
        assert!(PermissionLevel::Execute < PermissionLevel::Update);
    }

    #[test]
    fn test_permission_for_unknown_user_is_none() {
        let resource = Resource::new("dep-1", "web", Config::Deployment(DeploymentConfig::default()))
            .with_permission("alice", PermissionLevel::Read);
        assert_eq!(resource.permission_for("alice"), PermissionLevel::Read);
        assert_eq!(resource.permission_for("bob"), PermissionLevel::None);
    }

    #[test]
    fn test_resource_kind_follows_config() {
        let resource = Resource::new("dep-1", "web", Config::Deployment(DeploymentConfig::default()));
        assert_eq!(resource.kind(), ResourceKind::Deployment);
        assert_eq!(resource.kind().to_string(), "deployment");
    }

    #[test]
    fn test_resource_deserializes_with_defaults() {
        let json = r#"{
            "id": "srv-1",
            "name": "edge",
            "config": { "kind": "server", "address": "10.0.0.2" }
        }"#;
        let resource: Resource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.id.as_str(), "srv-1");
        assert_eq!(resource.status, ResourceStatus::Unknown);
        assert!(resource.permissions.is_empty());
        assert_eq!(resource.kind(), ResourceKind::Server);
    }
}
