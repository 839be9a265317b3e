//! JSON fixtures for seeding the in-memory control plane

use std::path::Path;

use serde::{Deserialize, Serialize};

use shipyard_core::prelude::*;
use shipyard_core::{
    BuilderConfig, Config, DeploymentConfig, EnvVar, PermissionLevel, PortMapping, Resource,
    ResourceStatus, RestartMode, ServerConfig, VolumeMount,
};

/// On-disk fixture layout: `{ "resources": [ ... ] }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// Load resources from a fixture file
pub fn load_fixture(path: &Path) -> Result<Vec<Resource>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        warn!("Failed to read fixture {}: {}", path.display(), e);
        Error::from(e)
    })?;
    let fixture: Fixture = serde_json::from_str(&content)?;
    info!(
        "Loaded {} resources from {}",
        fixture.resources.len(),
        path.display()
    );
    Ok(fixture.resources)
}

/// Built-in resources used when no fixture is configured
pub fn demo_resources() -> Vec<Resource> {
    vec![
        Resource::new(
            "dep-web",
            "web",
            Config::Deployment(DeploymentConfig {
                server_id: "srv-edge".into(),
                image: "nginx:1.27".into(),
                restart: RestartMode::UnlessStopped,
                ports: vec![PortMapping::new("80", "8080")],
                volumes: vec![VolumeMount::new("/srv/www", "/usr/share/nginx/html")],
                environment: vec![EnvVar::new("RUST_LOG", "info")],
                ..DeploymentConfig::default()
            }),
        )
        .with_status(ResourceStatus::Running)
        .with_tags(["frontend", "prod"])
        .with_permission("alice", PermissionLevel::Update)
        .with_permission("bob", PermissionLevel::Read),
        Resource::new(
            "dep-worker",
            "worker",
            Config::Deployment(DeploymentConfig {
                server_id: "srv-edge".into(),
                image: "ghcr.io/acme/worker:latest".into(),
                extra_args: vec!["--init".into()],
                ..DeploymentConfig::default()
            }),
        )
        .with_status(ResourceStatus::Exited)
        .with_tags(["backend"])
        .with_permission("alice", PermissionLevel::Execute),
        Resource::new(
            "srv-edge",
            "edge",
            Config::Server(ServerConfig {
                address: "https://10.0.0.2:8120".into(),
                region: "eu-west-1".into(),
                to_notify: vec!["alice".into()],
                ..ServerConfig::default()
            }),
        )
        .with_status(ResourceStatus::Healthy)
        .with_tags(["prod"])
        .with_permission("alice", PermissionLevel::Update),
        Resource::new(
            "bld-main",
            "main-builder",
            Config::Builder(BuilderConfig {
                ami_id: "ami-0abcdef1234567890".into(),
                assign_public_ip: true,
                ..BuilderConfig::default()
            }),
        )
        .with_status(ResourceStatus::Unknown)
        .with_permission("bob", PermissionLevel::Update),
    ]
}
