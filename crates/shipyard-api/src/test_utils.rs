//! Test utilities for resources and users
//!
//! Provides helper functions for building resources and users.

use shipyard_core::{
    BuilderConfig, Config, DeploymentConfig, PortMapping, Resource, ServerConfig, User,
};

/// Creates a deployment with one `80 -> 8080` port mapping.
pub fn test_deployment(id: &str, name: &str) -> Resource {
    Resource::new(
        id,
        name,
        Config::Deployment(DeploymentConfig {
            image: "nginx".to_string(),
            ports: vec![PortMapping::new("80", "8080")],
            ..DeploymentConfig::default()
        }),
    )
}

/// Creates a server with default alert thresholds.
pub fn test_server(id: &str, name: &str) -> Resource {
    Resource::new(
        id,
        name,
        Config::Server(ServerConfig {
            address: "https://10.0.0.1:8120".to_string(),
            ..ServerConfig::default()
        }),
    )
}

/// Creates a builder with default instance settings.
pub fn test_builder(id: &str, name: &str) -> Resource {
    Resource::new(id, name, Config::Builder(BuilderConfig::default()))
}

/// Creates a non-admin user whose id and username are both `id`.
pub fn test_user(id: &str) -> User {
    User::new(id, id)
}

/// Creates the admin user `admin`.
pub fn test_admin() -> User {
    User::admin("admin", "admin")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipyard_core::ResourceKind;

    #[test]
    fn test_helpers_build_each_kind() {
        assert_eq!(test_deployment("d", "d").kind(), ResourceKind::Deployment);
        assert_eq!(test_server("s", "s").kind(), ResourceKind::Server);
        assert_eq!(test_builder("b", "b").kind(), ResourceKind::Builder);
    }

    #[test]
    fn test_users() {
        assert!(test_admin().admin);
        assert!(!test_user("alice").admin);
    }
}
