//! Resource snapshot store
//!
//! Last server-confirmed state of every known resource. Only fetch and save
//! completions write here; local edits never do.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use shipyard_core::prelude::*;
use shipyard_core::{Resource, ResourceId};

/// A confirmed resource plus bookkeeping
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub resource: Resource,
    /// Bumped whenever the confirmed config changes
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of writing a resource into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotChange {
    /// First time this resource was seen
    Inserted,
    /// The config differs from the previous snapshot
    ConfigChanged,
    /// Only name, tags, permissions or status changed
    MetadataChanged,
    Unchanged,
}

impl SnapshotChange {
    pub fn config_changed(&self) -> bool {
        matches!(self, SnapshotChange::Inserted | SnapshotChange::ConfigChanged)
    }
}

/// Process-wide cache of confirmed resources
#[derive(Debug, Default)]
pub struct SnapshotStore {
    entries: BTreeMap<ResourceId, SnapshotEntry>,
    loaded: bool,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether at least one full listing has been applied
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Confirmed resource for `id`
    pub fn load(&self, id: &ResourceId) -> Result<&Resource> {
        self.entries
            .get(id)
            .map(|entry| &entry.resource)
            .ok_or_else(|| Error::not_found(id))
    }

    pub fn entry(&self, id: &ResourceId) -> Option<&SnapshotEntry> {
        self.entries.get(id)
    }

    pub fn revision(&self, id: &ResourceId) -> Option<u64> {
        self.entries.get(id).map(|entry| entry.revision)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entries.values().map(|entry| &entry.resource)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.entries.keys()
    }

    /// Replace the entry for `resource.id` as a whole
    pub fn on_external_update(&mut self, resource: Resource) -> SnapshotChange {
        let now = Utc::now();
        match self.entries.get_mut(&resource.id) {
            None => {
                trace!("snapshot inserted: {}", resource.id);
                self.entries.insert(
                    resource.id.clone(),
                    SnapshotEntry {
                        resource,
                        revision: 1,
                        updated_at: now,
                    },
                );
                SnapshotChange::Inserted
            }
            Some(entry) => {
                let change = if entry.resource.config != resource.config {
                    entry.revision += 1;
                    SnapshotChange::ConfigChanged
                } else if entry.resource != resource {
                    SnapshotChange::MetadataChanged
                } else {
                    SnapshotChange::Unchanged
                };
                if change != SnapshotChange::Unchanged {
                    trace!("snapshot {:?}: {} r{}", change, resource.id, entry.revision);
                    entry.resource = resource;
                    entry.updated_at = now;
                }
                change
            }
        }
    }

    /// Drop resources that a full listing no longer contains, returning their ids
    pub fn retain_listed(&mut self, listed: &[ResourceId]) -> Vec<ResourceId> {
        let removed: Vec<ResourceId> = self
            .entries
            .keys()
            .filter(|id| !listed.contains(id))
            .cloned()
            .collect();
        for id in &removed {
            self.entries.remove(id);
        }
        self.loaded = true;
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipyard_api::test_utils::{test_deployment, test_server};
    use shipyard_core::{Config, PermissionLevel, ResourceStatus};

    #[test]
    fn test_load_unknown_is_not_found() {
        let store = SnapshotStore::new();
        assert!(!store.is_loaded());
        assert!(matches!(
            store.load(&"dep-1".into()),
            Err(Error::ResourceNotFound { .. })
        ));
    }

    #[test]
    fn test_insert_then_unchanged() {
        let mut store = SnapshotStore::new();
        assert_eq!(
            store.on_external_update(test_deployment("dep-1", "web")),
            SnapshotChange::Inserted
        );
        assert_eq!(
            store.on_external_update(test_deployment("dep-1", "web")),
            SnapshotChange::Unchanged
        );
        assert_eq!(store.revision(&"dep-1".into()), Some(1));
    }

    #[test]
    fn test_config_change_bumps_revision() {
        let mut store = SnapshotStore::new();
        store.on_external_update(test_deployment("dep-1", "web"));

        let mut changed = test_deployment("dep-1", "web");
        if let Config::Deployment(c) = &mut changed.config {
            c.image = "nginx:1.27".into();
        }
        assert_eq!(
            store.on_external_update(changed),
            SnapshotChange::ConfigChanged
        );
        assert_eq!(store.revision(&"dep-1".into()), Some(2));
    }

    #[test]
    fn test_metadata_change_keeps_revision() {
        let mut store = SnapshotStore::new();
        store.on_external_update(test_deployment("dep-1", "web"));

        let updated = test_deployment("dep-1", "web")
            .with_status(ResourceStatus::Running)
            .with_permission("alice", PermissionLevel::Read);
        assert_eq!(
            store.on_external_update(updated),
            SnapshotChange::MetadataChanged
        );
        assert_eq!(store.revision(&"dep-1".into()), Some(1));
        assert_eq!(
            store.load(&"dep-1".into()).unwrap().status,
            ResourceStatus::Running
        );
    }

    #[test]
    fn test_retain_listed_removes_missing() {
        let mut store = SnapshotStore::new();
        store.on_external_update(test_deployment("dep-1", "web"));
        store.on_external_update(test_server("srv-1", "edge"));

        let removed = store.retain_listed(&["srv-1".into()]);
        assert_eq!(removed, vec![ResourceId::from("dep-1")]);
        assert!(store.is_loaded());
        assert_eq!(store.len(), 1);
    }
}
