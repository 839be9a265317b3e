//! Sparse configs for partial updates
//!
//! A partial carries only the top-level keys that changed. Keys left as
//! `None` are omitted from the JSON payload entirely.

use serde::{Deserialize, Serialize};

use crate::config::{
    BuilderConfig, Config, DeploymentConfig, EnvVar, PortMapping, RestartMode, ServerConfig,
    VolumeMount,
};
use crate::error::{Error, Result};
use crate::types::ResourceKind;

/// Declares a partial struct for a config kind together with its
/// field-wise diff, merge and changed-key listing.
macro_rules! partial_config {
    (
        $(#[$meta:meta])*
        $name:ident for $full:ident { $($field:ident: $ty:ty),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
        pub struct $name {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )+
        }

        impl $name {
            /// Keys of `current` that differ from `base`
            pub fn between(base: &$full, current: &$full) -> Self {
                Self {
                    $(
                        $field: (base.$field != current.$field)
                            .then(|| current.$field.clone()),
                    )+
                }
            }

            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())+
            }

            /// Names of the keys present in this partial, in declaration order
            pub fn changed_fields(&self) -> Vec<&'static str> {
                let mut fields = Vec::new();
                $(
                    if self.$field.is_some() {
                        fields.push(stringify!($field));
                    }
                )+
                fields
            }

            /// Overwrite every present key on `target`
            pub fn merge_into(&self, target: &mut $full) {
                $(
                    if let Some(value) = &self.$field {
                        target.$field = value.clone();
                    }
                )+
            }
        }
    };
}

partial_config! {
    /// Changed keys of a [`DeploymentConfig`]
    DeploymentPartial for DeploymentConfig {
        server_id: String,
        image: String,
        network: String,
        restart: RestartMode,
        container_user: String,
        docker_account: String,
        ports: Vec<PortMapping>,
        volumes: Vec<VolumeMount>,
        environment: Vec<EnvVar>,
        extra_args: Vec<String>,
    }
}

partial_config! {
    /// Changed keys of a [`ServerConfig`]
    ServerPartial for ServerConfig {
        address: String,
        region: String,
        enabled: bool,
        cpu_alert: f64,
        mem_alert: f64,
        disk_alert: f64,
        stats_interval_secs: u64,
        to_notify: Vec<String>,
    }
}

partial_config! {
    /// Changed keys of a [`BuilderConfig`]
    BuilderPartial for BuilderConfig {
        server_id: String,
        region: String,
        instance_type: String,
        ami_id: String,
        volume_gb: u64,
        assign_public_ip: bool,
        security_group_ids: Vec<String>,
    }
}

/// Sparse config payload for the partial-update API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartialConfig {
    Deployment(DeploymentPartial),
    Server(ServerPartial),
    Builder(BuilderPartial),
}

impl PartialConfig {
    pub fn kind(&self) -> ResourceKind {
        match self {
            PartialConfig::Deployment(_) => ResourceKind::Deployment,
            PartialConfig::Server(_) => ResourceKind::Server,
            PartialConfig::Builder(_) => ResourceKind::Builder,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PartialConfig::Deployment(p) => p.is_empty(),
            PartialConfig::Server(p) => p.is_empty(),
            PartialConfig::Builder(p) => p.is_empty(),
        }
    }

    pub fn changed_fields(&self) -> Vec<&'static str> {
        match self {
            PartialConfig::Deployment(p) => p.changed_fields(),
            PartialConfig::Server(p) => p.changed_fields(),
            PartialConfig::Builder(p) => p.changed_fields(),
        }
    }
}

impl Config {
    /// Top-level keys of `self` that differ from `base`.
    ///
    /// Fails with `KindMismatch` when the two configs are different kinds.
    pub fn diff(&self, base: &Config) -> Result<PartialConfig> {
        match (base, self) {
            (Config::Deployment(b), Config::Deployment(c)) => {
                Ok(PartialConfig::Deployment(DeploymentPartial::between(b, c)))
            }
            (Config::Server(b), Config::Server(c)) => {
                Ok(PartialConfig::Server(ServerPartial::between(b, c)))
            }
            (Config::Builder(b), Config::Builder(c)) => {
                Ok(PartialConfig::Builder(BuilderPartial::between(b, c)))
            }
            _ => Err(kind_mismatch(base.kind(), self.kind())),
        }
    }

    /// Apply every key present in `partial`
    pub fn merge(&mut self, partial: &PartialConfig) -> Result<()> {
        match (&mut *self, partial) {
            (Config::Deployment(c), PartialConfig::Deployment(p)) => p.merge_into(c),
            (Config::Server(c), PartialConfig::Server(p)) => p.merge_into(c),
            (Config::Builder(c), PartialConfig::Builder(p)) => p.merge_into(c),
            (config, partial) => return Err(kind_mismatch(config.kind(), partial.kind())),
        }
        Ok(())
    }
}

fn kind_mismatch(expected: ResourceKind, found: ResourceKind) -> Error {
    Error::KindMismatch {
        id: "config".to_string(),
        expected: expected.to_string(),
        found: found.to_string(),
    }
}
