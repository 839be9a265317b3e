//! In-process control plane
//!
//! `MemoryApi` keeps resources in a map and behaves like the remote service
//! for everything the editor can observe: it enforces update permission,
//! validates and normalizes submitted configs, and returns the stored
//! resource. It also records every submission and how many were in flight
//! per resource, and can hold or fail requests on demand.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex as StdMutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};

use shipyard_core::prelude::*;
use shipyard_core::{
    can_edit, Config, PartialConfig, PermissionLevel, Resource, ResourceId, User,
};

use crate::fixture::load_fixture;
use crate::ApiClient;

/// A partial update as received by the control plane
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub resource_id: ResourceId,
    pub partial: PartialConfig,
    pub operator: String,
}

/// Failure to return from the next update instead of processing it
#[derive(Debug, Clone, PartialEq)]
pub enum InjectedFailure {
    Network(String),
    Validation(String),
}

impl InjectedFailure {
    fn into_error(self) -> Error {
        match self {
            InjectedFailure::Network(message) => Error::network(message),
            InjectedFailure::Validation(message) => Error::validation(message),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    resources: BTreeMap<ResourceId, Resource>,
    submissions: Vec<Submission>,
    failures: VecDeque<InjectedFailure>,
}

/// Concurrent update counts per resource
#[derive(Debug, Default)]
struct InFlight {
    current: HashMap<ResourceId, usize>,
    max: HashMap<ResourceId, usize>,
}

/// Counts one update as in flight until dropped, including when the caller
/// abandons the request future
struct InFlightGuard<'a> {
    counts: &'a StdMutex<InFlight>,
    id: ResourceId,
}

impl<'a> InFlightGuard<'a> {
    fn enter(counts: &'a StdMutex<InFlight>, id: ResourceId) -> Self {
        let mut guard = lock(counts);
        let in_flight = &mut *guard;
        let current = in_flight.current.entry(id.clone()).or_insert(0);
        *current += 1;
        let max = in_flight.max.entry(id.clone()).or_insert(0);
        *max = (*max).max(*current);
        drop(guard);
        Self { counts, id }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(count) = lock(self.counts).current.get_mut(&self.id) {
            *count = count.saturating_sub(1);
        }
    }
}

fn lock(counts: &StdMutex<InFlight>) -> MutexGuard<'_, InFlight> {
    counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory [`ApiClient`] implementation
#[derive(Debug)]
pub struct MemoryApi {
    inner: Mutex<Inner>,
    in_flight: StdMutex<InFlight>,
    latency: Option<Duration>,
    holding: AtomicBool,
    gate: Semaphore,
}

impl MemoryApi {
    pub fn new(resources: impl IntoIterator<Item = Resource>) -> Self {
        let resources = resources
            .into_iter()
            .map(|resource| (resource.id.clone(), resource))
            .collect();
        Self {
            inner: Mutex::new(Inner {
                resources,
                ..Inner::default()
            }),
            in_flight: StdMutex::new(InFlight::default()),
            latency: None,
            holding: AtomicBool::new(false),
            gate: Semaphore::new(0),
        }
    }

    /// Seed from a JSON fixture file
    pub fn from_fixture(path: &Path) -> Result<Self> {
        Ok(Self::new(load_fixture(path)?))
    }

    /// Delay every request by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Park updates until [`release`](Self::release) is called
    pub fn hold_updates(&self) {
        self.holding.store(true, Ordering::SeqCst);
    }

    /// Let `count` parked (or future) updates proceed
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// Queue a failure for the next update
    pub async fn fail_next_update(&self, failure: InjectedFailure) {
        self.inner.lock().await.failures.push_back(failure);
    }

    /// Replace a stored resource as if another client had changed it
    pub async fn put_resource(&self, resource: Resource) {
        self.inner
            .lock()
            .await
            .resources
            .insert(resource.id.clone(), resource);
    }

    /// Change a user's permission level on a stored resource
    pub async fn set_permission(&self, id: &ResourceId, user_id: &str, level: PermissionLevel) {
        if let Some(resource) = self.inner.lock().await.resources.get_mut(id) {
            resource.permissions.insert(user_id.to_string(), level);
        }
    }

    pub async fn submissions(&self) -> Vec<Submission> {
        self.inner.lock().await.submissions.clone()
    }

    /// Most updates ever concurrently in flight for `id`
    pub fn max_in_flight(&self, id: &ResourceId) -> usize {
        lock(&self.in_flight).max.get(id).copied().unwrap_or(0)
    }

    /// Updates for `id` currently being processed
    pub fn in_flight(&self, id: &ResourceId) -> usize {
        lock(&self.in_flight).current.get(id).copied().unwrap_or(0)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn wait_for_gate(&self) {
        if self.holding.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
    }

    async fn record_submission(&self, submission: Submission) {
        self.inner.lock().await.submissions.push(submission);
    }

    async fn finish_update(
        &self,
        id: &ResourceId,
        partial: &PartialConfig,
        operator: &User,
    ) -> Result<Resource> {
        let mut inner = self.inner.lock().await;
        if let Some(failure) = inner.failures.pop_front() {
            return Err(failure.into_error());
        }

        let resource = inner
            .resources
            .get_mut(id)
            .ok_or_else(|| Error::not_found(id))?;

        if !can_edit(operator, resource) {
            return Err(Error::PermissionRevoked { id: id.to_string() });
        }

        let mut config = resource.config.clone();
        config
            .merge(partial)
            .map_err(|e| Error::validation(e.to_string()))?;
        config.normalize();
        validate(&config)?;

        resource.config = config;
        Ok(resource.clone())
    }
}

/// Server-side checks beyond what the field editors enforce
fn validate(config: &Config) -> Result<()> {
    if let Config::Deployment(deployment) = config {
        if let Some(var) = deployment
            .environment
            .iter()
            .find(|var| var.variable.is_empty())
        {
            return Err(Error::validation(format!(
                "environment value '{}' has no variable name",
                var.value
            )));
        }
    }
    Ok(())
}

impl ApiClient for MemoryApi {
    async fn list_resources(&self) -> Result<Vec<Resource>> {
        self.simulate_latency().await;
        Ok(self.inner.lock().await.resources.values().cloned().collect())
    }

    async fn get_resource(&self, id: &ResourceId) -> Result<Resource> {
        self.simulate_latency().await;
        self.inner
            .lock()
            .await
            .resources
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(id))
    }

    async fn update_config(
        &self,
        id: &ResourceId,
        partial: PartialConfig,
        operator: &User,
    ) -> Result<Resource> {
        debug!(
            "update_config {} by {}: {:?}",
            id,
            operator.id,
            partial.changed_fields()
        );
        let _in_flight = InFlightGuard::enter(&self.in_flight, id.clone());
        self.record_submission(Submission {
            resource_id: id.clone(),
            partial: partial.clone(),
            operator: operator.id.clone(),
        })
        .await;

        self.simulate_latency().await;
        self.wait_for_gate().await;

        self.finish_update(id, &partial, operator).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_utils::{test_admin, test_deployment, test_user};
    use shipyard_core::{DeploymentConfig, EnvVar, PortMapping};

    fn ports_partial(ports: Vec<PortMapping>) -> PartialConfig {
        let base = Config::Deployment(DeploymentConfig::default());
        let changed = Config::Deployment(DeploymentConfig {
            ports,
            ..DeploymentConfig::default()
        });
        changed.diff(&base).unwrap()
    }

    #[tokio::test]
    async fn test_latency_delays_requests() {
        let api = MemoryApi::new([test_deployment("dep-1", "web")])
            .with_latency(Duration::from_millis(15));
        let started = tokio::time::Instant::now();
        api.list_resources().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(15));
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let api = MemoryApi::new([test_deployment("dep-1", "web")]);
        assert_eq!(api.list_resources().await.unwrap().len(), 1);
        assert_eq!(
            api.get_resource(&"dep-1".into()).await.unwrap().name,
            "web"
        );
        assert!(matches!(
            api.get_resource(&"nope".into()).await,
            Err(Error::ResourceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_merges_and_normalizes() {
        let api = MemoryApi::new([test_deployment("dep-1", "web")]);
        let partial = ports_partial(vec![
            PortMapping::new(" 443 ", "8443"),
            PortMapping::new("", ""),
        ]);

        let updated = api
            .update_config(&"dep-1".into(), partial.clone(), &test_admin())
            .await
            .unwrap();
        let Config::Deployment(config) = updated.config else {
            panic!("expected deployment");
        };
        assert_eq!(config.ports, vec![PortMapping::new("443", "8443")]);

        let submissions = api.submissions().await;
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].partial, partial);
        assert_eq!(submissions[0].operator, "admin");
    }

    #[tokio::test]
    async fn test_update_without_permission_is_revoked() {
        let api = MemoryApi::new([test_deployment("dep-1", "web")
            .with_permission("alice", PermissionLevel::Read)]);
        let err = api
            .update_config(&"dep-1".into(), ports_partial(vec![]), &test_user("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PermissionRevoked { .. }));
    }

    #[tokio::test]
    async fn test_validation_rejects_unnamed_env_value() {
        let api = MemoryApi::new([test_deployment("dep-1", "web")]);
        let base = Config::Deployment(DeploymentConfig::default());
        let changed = Config::Deployment(DeploymentConfig {
            environment: vec![EnvVar::new("", "secret")],
            ..DeploymentConfig::default()
        });
        let err = api
            .update_config(&"dep-1".into(), changed.diff(&base).unwrap(), &test_admin())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let api = MemoryApi::new([test_deployment("dep-1", "web")]);
        api.fail_next_update(InjectedFailure::Network("connection reset".into()))
            .await;

        let first = api
            .update_config(&"dep-1".into(), ports_partial(vec![]), &test_admin())
            .await;
        assert!(matches!(first, Err(Error::Network { .. })));

        let second = api
            .update_config(&"dep-1".into(), ports_partial(vec![]), &test_admin())
            .await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_held_updates_track_concurrency() {
        let api = Arc::new(MemoryApi::new([test_deployment("dep-1", "web")]));
        api.hold_updates();

        let first = {
            let api = Arc::clone(&api);
            tokio::spawn(async move {
                api.update_config(&"dep-1".into(), ports_partial(vec![]), &test_admin())
                    .await
            })
        };
        let second = {
            let api = Arc::clone(&api);
            tokio::spawn(async move {
                api.update_config(&"dep-1".into(), ports_partial(vec![]), &test_admin())
                    .await
            })
        };

        while api.submissions().await.len() < 2 {
            tokio::task::yield_now().await;
        }
        api.release(2);
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        assert_eq!(api.max_in_flight(&"dep-1".into()), 2);
        assert_eq!(api.in_flight(&"dep-1".into()), 0);
    }

    #[tokio::test]
    async fn test_abandoned_update_leaves_flight() {
        let api = MemoryApi::new([test_deployment("dep-1", "web")]);
        api.hold_updates();
        let id = ResourceId::from("dep-1");

        let timed_out = tokio::time::timeout(
            Duration::from_millis(10),
            api.update_config(&id, ports_partial(vec![]), &test_admin()),
        )
        .await;
        assert!(timed_out.is_err());
        assert_eq!(api.in_flight(&id), 0);

        api.release(1);
        api.update_config(&id, ports_partial(vec![]), &test_admin())
            .await
            .unwrap();
        assert_eq!(api.max_in_flight(&id), 1);
    }
}
