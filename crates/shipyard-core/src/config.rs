//! Resource configuration payloads
//!
//! Each resource kind has its own closed config struct; [`Config`] is the
//! tagged union over them. Field access by [`FieldPath`] is an exhaustive
//! match per kind, so an editor addressing an unknown field fails with
//! `InvalidPath` instead of silently growing the config.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::edit::FieldValue;
use crate::error::{Error, Result};
use crate::path::{FieldPath, PathSegment};
use crate::types::ResourceKind;

// ─────────────────────────────────────────────────────────────────────────────
// List element types
// ─────────────────────────────────────────────────────────────────────────────

/// Host-to-container port binding
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PortMapping {
    pub local: String,
    pub container: String,
}

impl PortMapping {
    pub fn new(local: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            container: container.into(),
        }
    }
}

/// Host-path-to-container-path volume binding
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VolumeMount {
    pub local: String,
    pub container: String,
}

impl VolumeMount {
    pub fn new(local: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            container: container.into(),
        }
    }
}

/// A single environment variable
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvVar {
    pub variable: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(variable: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            value: value.into(),
        }
    }
}

/// An element of an ordered list field
pub trait ListElement: Clone + PartialEq {
    /// Value type name reported in type mismatch errors
    const TYPE_NAME: &'static str;

    fn to_value(&self) -> FieldValue;

    /// Convert a field value back into an element, handing the value back on mismatch
    fn from_value(value: FieldValue) -> std::result::Result<Self, FieldValue>;

    fn subfield(&self, name: &str) -> Option<&String>;

    fn subfield_mut(&mut self, name: &str) -> Option<&mut String>;

    /// Trim whitespace; returns false when nothing is left
    fn normalize(&mut self) -> bool;
}

impl ListElement for PortMapping {
    const TYPE_NAME: &'static str = "port";

    fn to_value(&self) -> FieldValue {
        FieldValue::Port(self.clone())
    }

    fn from_value(value: FieldValue) -> std::result::Result<Self, FieldValue> {
        match value {
            FieldValue::Port(port) => Ok(port),
            other => Err(other),
        }
    }

    fn subfield(&self, name: &str) -> Option<&String> {
        match name {
            "local" => Some(&self.local),
            "container" => Some(&self.container),
            _ => None,
        }
    }

    fn subfield_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "local" => Some(&mut self.local),
            "container" => Some(&mut self.container),
            _ => None,
        }
    }

    fn normalize(&mut self) -> bool {
        trim_in_place(&mut self.local);
        trim_in_place(&mut self.container);
        !(self.local.is_empty() && self.container.is_empty())
    }
}

impl ListElement for VolumeMount {
    const TYPE_NAME: &'static str = "mount";

    fn to_value(&self) -> FieldValue {
        FieldValue::Mount(self.clone())
    }

    fn from_value(value: FieldValue) -> std::result::Result<Self, FieldValue> {
        match value {
            FieldValue::Mount(mount) => Ok(mount),
            other => Err(other),
        }
    }

    fn subfield(&self, name: &str) -> Option<&String> {
        match name {
            "local" => Some(&self.local),
            "container" => Some(&self.container),
            _ => None,
        }
    }

    fn subfield_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "local" => Some(&mut self.local),
            "container" => Some(&mut self.container),
            _ => None,
        }
    }

    fn normalize(&mut self) -> bool {
        trim_in_place(&mut self.local);
        trim_in_place(&mut self.container);
        !(self.local.is_empty() && self.container.is_empty())
    }
}

impl ListElement for EnvVar {
    const TYPE_NAME: &'static str = "env";

    fn to_value(&self) -> FieldValue {
        FieldValue::Env(self.clone())
    }

    fn from_value(value: FieldValue) -> std::result::Result<Self, FieldValue> {
        match value {
            FieldValue::Env(var) => Ok(var),
            other => Err(other),
        }
    }

    fn subfield(&self, name: &str) -> Option<&String> {
        match name {
            "variable" => Some(&self.variable),
            "value" => Some(&self.value),
            _ => None,
        }
    }

    fn subfield_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "variable" => Some(&mut self.variable),
            "value" => Some(&mut self.value),
            _ => None,
        }
    }

    fn normalize(&mut self) -> bool {
        trim_in_place(&mut self.variable);
        // values keep their whitespace; only the name is an identifier
        !(self.variable.is_empty() && self.value.is_empty())
    }
}

impl ListElement for String {
    const TYPE_NAME: &'static str = "text";

    fn to_value(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn from_value(value: FieldValue) -> std::result::Result<Self, FieldValue> {
        match value {
            FieldValue::Text(text) => Ok(text),
            other => Err(other),
        }
    }

    fn subfield(&self, _name: &str) -> Option<&String> {
        None
    }

    fn subfield_mut(&mut self, _name: &str) -> Option<&mut String> {
        None
    }

    fn normalize(&mut self) -> bool {
        trim_in_place(self);
        !self.is_empty()
    }
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scalar helper types
// ─────────────────────────────────────────────────────────────────────────────

/// Docker restart policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartMode {
    #[default]
    No,
    OnFailure,
    Always,
    UnlessStopped,
}

impl RestartMode {
    pub const ALL: [RestartMode; 4] = [
        RestartMode::No,
        RestartMode::OnFailure,
        RestartMode::Always,
        RestartMode::UnlessStopped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RestartMode::No => "no",
            RestartMode::OnFailure => "on-failure",
            RestartMode::Always => "always",
            RestartMode::UnlessStopped => "unless-stopped",
        }
    }
}

impl fmt::Display for RestartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestartMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RestartMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown restart mode '{s}' (expected one of: no, on-failure, always, unless-stopped)"
                )
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-kind configs
// ─────────────────────────────────────────────────────────────────────────────

/// Deployment (container) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Server the container runs on
    pub server_id: String,
    pub image: String,
    pub network: String,
    pub restart: RestartMode,
    pub container_user: String,
    pub docker_account: String,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<VolumeMount>,
    pub environment: Vec<EnvVar>,
    pub extra_args: Vec<String>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            server_id: String::new(),
            image: String::new(),
            network: "bridge".to_string(),
            restart: RestartMode::No,
            container_user: String::new(),
            docker_account: String::new(),
            ports: Vec::new(),
            volumes: Vec::new(),
            environment: Vec::new(),
            extra_args: Vec::new(),
        }
    }
}

impl DeploymentConfig {
    pub const FIELDS: &'static [&'static str] = &[
        "server_id",
        "image",
        "network",
        "restart",
        "container_user",
        "docker_account",
        "ports",
        "volumes",
        "environment",
        "extra_args",
    ];

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        Some(match name {
            "server_id" => FieldRef::Text(&self.server_id),
            "image" => FieldRef::Text(&self.image),
            "network" => FieldRef::Text(&self.network),
            "restart" => FieldRef::Restart(&self.restart),
            "container_user" => FieldRef::Text(&self.container_user),
            "docker_account" => FieldRef::Text(&self.docker_account),
            "ports" => FieldRef::Ports(&self.ports),
            "volumes" => FieldRef::Mounts(&self.volumes),
            "environment" => FieldRef::Env(&self.environment),
            "extra_args" => FieldRef::Strings(&self.extra_args),
            _ => return None,
        })
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        Some(match name {
            "server_id" => FieldMut::Text(&mut self.server_id),
            "image" => FieldMut::Text(&mut self.image),
            "network" => FieldMut::Text(&mut self.network),
            "restart" => FieldMut::Restart(&mut self.restart),
            "container_user" => FieldMut::Text(&mut self.container_user),
            "docker_account" => FieldMut::Text(&mut self.docker_account),
            "ports" => FieldMut::Ports(&mut self.ports),
            "volumes" => FieldMut::Mounts(&mut self.volumes),
            "environment" => FieldMut::Env(&mut self.environment),
            "extra_args" => FieldMut::Strings(&mut self.extra_args),
            _ => return None,
        })
    }

    fn normalize(&mut self) {
        for text in [
            &mut self.server_id,
            &mut self.image,
            &mut self.network,
            &mut self.container_user,
            &mut self.docker_account,
        ] {
            trim_in_place(text);
        }
        normalize_list(&mut self.ports);
        normalize_list(&mut self.volumes);
        normalize_list(&mut self.environment);
        normalize_list(&mut self.extra_args);
    }
}

/// Server (host agent) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub region: String,
    pub enabled: bool,
    /// CPU usage percentage that triggers an alert
    pub cpu_alert: f64,
    /// Memory usage percentage that triggers an alert
    pub mem_alert: f64,
    /// Disk usage percentage that triggers an alert
    pub disk_alert: f64,
    pub stats_interval_secs: u64,
    /// User ids notified on alerts
    pub to_notify: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            region: String::new(),
            enabled: true,
            cpu_alert: 50.0,
            mem_alert: 75.0,
            disk_alert: 75.0,
            stats_interval_secs: 5,
            to_notify: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub const FIELDS: &'static [&'static str] = &[
        "address",
        "region",
        "enabled",
        "cpu_alert",
        "mem_alert",
        "disk_alert",
        "stats_interval_secs",
        "to_notify",
    ];

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        Some(match name {
            "address" => FieldRef::Text(&self.address),
            "region" => FieldRef::Text(&self.region),
            "enabled" => FieldRef::Bool(&self.enabled),
            "cpu_alert" => FieldRef::Percent(&self.cpu_alert),
            "mem_alert" => FieldRef::Percent(&self.mem_alert),
            "disk_alert" => FieldRef::Percent(&self.disk_alert),
            "stats_interval_secs" => FieldRef::Count(&self.stats_interval_secs),
            "to_notify" => FieldRef::Strings(&self.to_notify),
            _ => return None,
        })
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        Some(match name {
            "address" => FieldMut::Text(&mut self.address),
            "region" => FieldMut::Text(&mut self.region),
            "enabled" => FieldMut::Bool(&mut self.enabled),
            "cpu_alert" => FieldMut::Percent(&mut self.cpu_alert),
            "mem_alert" => FieldMut::Percent(&mut self.mem_alert),
            "disk_alert" => FieldMut::Percent(&mut self.disk_alert),
            "stats_interval_secs" => FieldMut::Count(&mut self.stats_interval_secs),
            "to_notify" => FieldMut::Strings(&mut self.to_notify),
            _ => return None,
        })
    }

    fn normalize(&mut self) {
        trim_in_place(&mut self.address);
        trim_in_place(&mut self.region);
        normalize_list(&mut self.to_notify);
    }
}

/// Builder (image build host) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Build on an existing server (empty when using a cloud instance)
    pub server_id: String,
    pub region: String,
    pub instance_type: String,
    pub ami_id: String,
    pub volume_gb: u64,
    pub assign_public_ip: bool,
    pub security_group_ids: Vec<String>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            server_id: String::new(),
            region: "us-east-1".to_string(),
            instance_type: "c5.2xlarge".to_string(),
            ami_id: String::new(),
            volume_gb: 20,
            assign_public_ip: false,
            security_group_ids: Vec::new(),
        }
    }
}

impl BuilderConfig {
    pub const FIELDS: &'static [&'static str] = &[
        "server_id",
        "region",
        "instance_type",
        "ami_id",
        "volume_gb",
        "assign_public_ip",
        "security_group_ids",
    ];

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        Some(match name {
            "server_id" => FieldRef::Text(&self.server_id),
            "region" => FieldRef::Text(&self.region),
            "instance_type" => FieldRef::Text(&self.instance_type),
            "ami_id" => FieldRef::Text(&self.ami_id),
            "volume_gb" => FieldRef::Count(&self.volume_gb),
            "assign_public_ip" => FieldRef::Bool(&self.assign_public_ip),
            "security_group_ids" => FieldRef::Strings(&self.security_group_ids),
            _ => return None,
        })
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        Some(match name {
            "server_id" => FieldMut::Text(&mut self.server_id),
            "region" => FieldMut::Text(&mut self.region),
            "instance_type" => FieldMut::Text(&mut self.instance_type),
            "ami_id" => FieldMut::Text(&mut self.ami_id),
            "volume_gb" => FieldMut::Count(&mut self.volume_gb),
            "assign_public_ip" => FieldMut::Bool(&mut self.assign_public_ip),
            "security_group_ids" => FieldMut::Strings(&mut self.security_group_ids),
            _ => return None,
        })
    }

    fn normalize(&mut self) {
        trim_in_place(&mut self.server_id);
        trim_in_place(&mut self.region);
        trim_in_place(&mut self.instance_type);
        trim_in_place(&mut self.ami_id);
        normalize_list(&mut self.security_group_ids);
    }
}

fn normalize_list<T: ListElement>(list: &mut Vec<T>) {
    list.retain_mut(|item| item.normalize());
}

// ─────────────────────────────────────────────────────────────────────────────
// Tagged union
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration payload of a resource, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Config {
    Deployment(DeploymentConfig),
    Server(ServerConfig),
    Builder(BuilderConfig),
}

impl Config {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Config::Deployment(_) => ResourceKind::Deployment,
            Config::Server(_) => ResourceKind::Server,
            Config::Builder(_) => ResourceKind::Builder,
        }
    }

    /// Top-level field names for this kind, in declaration order
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            Config::Deployment(_) => DeploymentConfig::FIELDS,
            Config::Server(_) => ServerConfig::FIELDS,
            Config::Builder(_) => BuilderConfig::FIELDS,
        }
    }

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match self {
            Config::Deployment(c) => c.field(name),
            Config::Server(c) => c.field(name),
            Config::Builder(c) => c.field(name),
        }
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        match self {
            Config::Deployment(c) => c.field_mut(name),
            Config::Server(c) => c.field_mut(name),
            Config::Builder(c) => c.field_mut(name),
        }
    }

    fn resolve<'s, 'p>(&'s self, path: &'p FieldPath) -> Result<(FieldRef<'s>, &'p [PathSegment])> {
        let (root, rest) = path.split_root()?;
        let kind = self.kind();
        let field = self
            .field(root)
            .ok_or_else(|| Error::invalid_path(path, format!("no field '{root}' on {kind}")))?;
        Ok((field, rest))
    }

    fn resolve_mut<'s, 'p>(&'s mut self, path: &'p FieldPath) -> Result<(FieldMut<'s>, &'p [PathSegment])> {
        let (root, rest) = path.split_root()?;
        let kind = self.kind();
        let field = self
            .field_mut(root)
            .ok_or_else(|| Error::invalid_path(path, format!("no field '{root}' on {kind}")))?;
        Ok((field, rest))
    }

    /// Read the scalar, list element or element sub-field at `path`
    pub fn get(&self, path: &FieldPath) -> Result<FieldValue> {
        let (field, rest) = self.resolve(path)?;
        match field {
            FieldRef::Ports(list) => list_get(list, path, rest),
            FieldRef::Mounts(list) => list_get(list, path, rest),
            FieldRef::Env(list) => list_get(list, path, rest),
            FieldRef::Strings(list) => list_get(list, path, rest),
            scalar => {
                ensure_leaf(path, rest)?;
                Ok(scalar.value())
            }
        }
    }

    /// All elements of the list field at `path`, in order
    pub fn list_items(&self, path: &FieldPath) -> Result<Vec<FieldValue>> {
        let (field, rest) = self.resolve(path)?;
        ensure_leaf(path, rest)?;
        match field {
            FieldRef::Ports(list) => Ok(list.iter().map(ListElement::to_value).collect()),
            FieldRef::Mounts(list) => Ok(list.iter().map(ListElement::to_value).collect()),
            FieldRef::Env(list) => Ok(list.iter().map(ListElement::to_value).collect()),
            FieldRef::Strings(list) => Ok(list.iter().map(ListElement::to_value).collect()),
            _ => Err(Error::invalid_path(path, "not a list field")),
        }
    }

    /// An empty element of the list field at `path`, used as the default for inserts
    pub fn empty_element(&self, path: &FieldPath) -> Result<FieldValue> {
        let (field, rest) = self.resolve(path)?;
        ensure_leaf(path, rest)?;
        match field {
            FieldRef::Ports(_) => Ok(PortMapping::default().to_value()),
            FieldRef::Mounts(_) => Ok(VolumeMount::default().to_value()),
            FieldRef::Env(_) => Ok(EnvVar::default().to_value()),
            FieldRef::Strings(_) => Ok(String::new().to_value()),
            _ => Err(Error::invalid_path(path, "not a list field")),
        }
    }

    /// Replace the value at `path`, returning the previous value
    pub fn set_field(&mut self, path: &FieldPath, value: FieldValue) -> Result<FieldValue> {
        let (field, rest) = self.resolve_mut(path)?;
        match field {
            FieldMut::Ports(list) => list_set(list, path, rest, value),
            FieldMut::Mounts(list) => list_set(list, path, rest, value),
            FieldMut::Env(list) => list_set(list, path, rest, value),
            FieldMut::Strings(list) => list_set(list, path, rest, value),
            scalar => {
                ensure_leaf(path, rest)?;
                scalar.set(path, value)
            }
        }
    }

    /// Insert into the list at `path`; `index == len` appends
    pub fn insert_at(&mut self, path: &FieldPath, index: usize, value: FieldValue) -> Result<()> {
        let (field, rest) = self.resolve_mut(path)?;
        ensure_leaf(path, rest)?;
        match field {
            FieldMut::Ports(list) => list_insert(list, path, index, value),
            FieldMut::Mounts(list) => list_insert(list, path, index, value),
            FieldMut::Env(list) => list_insert(list, path, index, value),
            FieldMut::Strings(list) => list_insert(list, path, index, value),
            _ => Err(Error::invalid_path(path, "not a list field")),
        }
    }

    /// Remove from the list at `path`, returning the removed element
    pub fn remove_at(&mut self, path: &FieldPath, index: usize) -> Result<FieldValue> {
        let (field, rest) = self.resolve_mut(path)?;
        ensure_leaf(path, rest)?;
        match field {
            FieldMut::Ports(list) => list_remove(list, path, index),
            FieldMut::Mounts(list) => list_remove(list, path, index),
            FieldMut::Env(list) => list_remove(list, path, index),
            FieldMut::Strings(list) => list_remove(list, path, index),
            _ => Err(Error::invalid_path(path, "not a list field")),
        }
    }

    /// Trim text values and drop list entries that are entirely blank
    pub fn normalize(&mut self) {
        match self {
            Config::Deployment(c) => c.normalize(),
            Config::Server(c) => c.normalize(),
            Config::Builder(c) => c.normalize(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Field access
// ─────────────────────────────────────────────────────────────────────────────

enum FieldRef<'a> {
    Text(&'a String),
    Restart(&'a RestartMode),
    Bool(&'a bool),
    Percent(&'a f64),
    Count(&'a u64),
    Ports(&'a Vec<PortMapping>),
    Mounts(&'a Vec<VolumeMount>),
    Env(&'a Vec<EnvVar>),
    Strings(&'a Vec<String>),
}

impl FieldRef<'_> {
    fn value(&self) -> FieldValue {
        match self {
            FieldRef::Text(v) => FieldValue::Text((*v).clone()),
            FieldRef::Restart(v) => FieldValue::Text(v.to_string()),
            FieldRef::Bool(v) => FieldValue::Bool(**v),
            FieldRef::Percent(v) => FieldValue::Number(**v),
            FieldRef::Count(v) => FieldValue::Number(**v as f64),
            // lists are read element-wise; callers never reach this arm
            FieldRef::Ports(_) | FieldRef::Mounts(_) | FieldRef::Env(_) | FieldRef::Strings(_) => {
                FieldValue::Text(String::new())
            }
        }
    }
}

enum FieldMut<'a> {
    Text(&'a mut String),
    Restart(&'a mut RestartMode),
    Bool(&'a mut bool),
    Percent(&'a mut f64),
    Count(&'a mut u64),
    Ports(&'a mut Vec<PortMapping>),
    Mounts(&'a mut Vec<VolumeMount>),
    Env(&'a mut Vec<EnvVar>),
    Strings(&'a mut Vec<String>),
}

impl FieldMut<'_> {
    fn set(self, path: &FieldPath, value: FieldValue) -> Result<FieldValue> {
        match (self, value) {
            (FieldMut::Text(target), FieldValue::Text(v)) => {
                Ok(FieldValue::Text(std::mem::replace(target, v)))
            }
            (FieldMut::Restart(target), FieldValue::Text(v)) => {
                let mode = v
                    .parse::<RestartMode>()
                    .map_err(|e| Error::invalid_value(path, e))?;
                let previous = std::mem::replace(target, mode);
                Ok(FieldValue::Text(previous.to_string()))
            }
            (FieldMut::Bool(target), FieldValue::Bool(v)) => {
                Ok(FieldValue::Bool(std::mem::replace(target, v)))
            }
            (FieldMut::Percent(target), FieldValue::Number(v)) => {
                if !(0.0..=100.0).contains(&v) {
                    return Err(Error::invalid_value(path, "must be between 0 and 100"));
                }
                Ok(FieldValue::Number(std::mem::replace(target, v)))
            }
            (FieldMut::Count(target), FieldValue::Number(v)) => {
                if v < 0.0 || v.fract() != 0.0 || v > u64::MAX as f64 {
                    return Err(Error::invalid_value(path, "must be a whole number"));
                }
                let previous = std::mem::replace(target, v as u64);
                Ok(FieldValue::Number(previous as f64))
            }
            (FieldMut::Text(_) | FieldMut::Restart(_), other) => {
                Err(Error::type_mismatch(path, "text", other.type_name()))
            }
            (FieldMut::Bool(_), other) => Err(Error::type_mismatch(path, "bool", other.type_name())),
            (FieldMut::Percent(_) | FieldMut::Count(_), other) => {
                Err(Error::type_mismatch(path, "number", other.type_name()))
            }
            (
                FieldMut::Ports(_) | FieldMut::Mounts(_) | FieldMut::Env(_) | FieldMut::Strings(_),
                _,
            ) => Err(Error::invalid_path(
                path,
                "lists are edited with insert_at/remove_at",
            )),
        }
    }
}

fn ensure_leaf(path: &FieldPath, rest: &[PathSegment]) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::invalid_path(path, "field has no children"))
    }
}

fn element<'a, T>(list: &'a [T], path: &FieldPath, index: usize) -> Result<&'a T> {
    list.get(index)
        .ok_or_else(|| Error::index_out_of_range(path, index, list.len()))
}

fn list_get<T: ListElement>(list: &[T], path: &FieldPath, rest: &[PathSegment]) -> Result<FieldValue> {
    match rest {
        [PathSegment::Index(i)] => Ok(element(list, path, *i)?.to_value()),
        [PathSegment::Index(i), PathSegment::Key(sub)] => element(list, path, *i)?
            .subfield(sub)
            .map(|v| FieldValue::Text(v.clone()))
            .ok_or_else(|| Error::invalid_path(path, format!("no sub-field '{sub}'"))),
        [] => Err(Error::invalid_path(path, "list fields are read with list_items")),
        _ => Err(Error::invalid_path(path, "unsupported list path")),
    }
}

fn list_set<T: ListElement>(
    list: &mut [T],
    path: &FieldPath,
    rest: &[PathSegment],
    value: FieldValue,
) -> Result<FieldValue> {
    match rest {
        [PathSegment::Index(i)] => {
            let len = list.len();
            let slot = list
                .get_mut(*i)
                .ok_or_else(|| Error::index_out_of_range(path, *i, len))?;
            let item = T::from_value(value)
                .map_err(|v| Error::type_mismatch(path, T::TYPE_NAME, v.type_name()))?;
            Ok(std::mem::replace(slot, item).to_value())
        }
        [PathSegment::Index(i), PathSegment::Key(sub)] => {
            let len = list.len();
            let slot = list
                .get_mut(*i)
                .ok_or_else(|| Error::index_out_of_range(path, *i, len))?;
            let target = slot
                .subfield_mut(sub)
                .ok_or_else(|| Error::invalid_path(path, format!("no sub-field '{sub}'")))?;
            match value {
                FieldValue::Text(v) => Ok(FieldValue::Text(std::mem::replace(target, v))),
                other => Err(Error::type_mismatch(path, "text", other.type_name())),
            }
        }
        [] => Err(Error::invalid_path(
            path,
            "lists are edited with insert_at/remove_at",
        )),
        _ => Err(Error::invalid_path(path, "unsupported list path")),
    }
}

fn list_insert<T: ListElement>(
    list: &mut Vec<T>,
    path: &FieldPath,
    index: usize,
    value: FieldValue,
) -> Result<()> {
    if index > list.len() {
        return Err(Error::index_out_of_range(path, index, list.len()));
    }
    let item = T::from_value(value)
        .map_err(|v| Error::type_mismatch(path, T::TYPE_NAME, v.type_name()))?;
    list.insert(index, item);
    Ok(())
}

fn list_remove<T: ListElement>(list: &mut Vec<T>, path: &FieldPath, index: usize) -> Result<FieldValue> {
    if index >= list.len() {
        return Err(Error::index_out_of_range(path, index, list.len()));
    }
    Ok(list.remove(index).to_value())
}
