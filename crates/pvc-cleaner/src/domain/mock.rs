//! Test adapters implementing the cluster collaborator traits
//!
//! [`InMemoryCluster`] keeps plain object lists and supports failure injection
//! per listing kind and per claim deletion. The free functions build minimal
//! Kubernetes objects carrying only the fields the detection reads.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use async_trait::async_trait;
use error_stack::Report;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::apps::v1::StatefulSetSpec;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use k8s_openapi::api::core::v1::PersistentVolumeClaimSpec;
use k8s_openapi::api::core::v1::PersistentVolumeClaimVolumeSource;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::core::v1::PodSpec;
use k8s_openapi::api::core::v1::Volume;
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::selector::PodSelector;
use super::traits::ClaimStore;
use super::traits::ClusterInventory;
use crate::platform::k8s::DeleteResult;
use crate::platform::k8s::KubernetesError;

#[derive(Debug, Default)]
struct FailurePlan {
    storage_classes: bool,
    claims: BTreeSet<String>,
    workloads: BTreeSet<String>,
    /// (namespace, rendered selector)
    pods: BTreeSet<(String, String)>,
    /// (namespace, claim)
    deletes: BTreeSet<(String, String)>,
}

/// In-memory cluster for tests
#[derive(Debug, Default)]
pub struct InMemoryCluster {
    storage_classes: Vec<StorageClass>,
    claims: Mutex<Vec<PersistentVolumeClaim>>,
    workloads: Vec<StatefulSet>,
    pods: Vec<Pod>,
    failures: FailurePlan,
    delete_calls: Mutex<Vec<(String, String)>>,
    pod_queries: Mutex<Vec<(String, String)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage_class(mut self, storage_class: StorageClass) -> Self {
        self.storage_classes.push(storage_class);
        self
    }

    pub fn with_claim(self, claim: PersistentVolumeClaim) -> Self {
        lock(&self.claims).push(claim);
        self
    }

    pub fn with_workload(mut self, workload: StatefulSet) -> Self {
        self.workloads.push(workload);
        self
    }

    pub fn with_pod(mut self, pod: Pod) -> Self {
        self.pods.push(pod);
        self
    }

    pub fn fail_storage_class_listing(mut self) -> Self {
        self.failures.storage_classes = true;
        self
    }

    pub fn fail_claim_listing(mut self, namespace: &str) -> Self {
        self.failures.claims.insert(namespace.to_string());
        self
    }

    pub fn fail_workload_listing(mut self, namespace: &str) -> Self {
        self.failures.workloads.insert(namespace.to_string());
        self
    }

    /// Fail pod listing for the selector of `workload`.
    pub fn fail_pod_listing_for(mut self, workload: &StatefulSet) -> Self {
        let namespace = workload.metadata.namespace.clone().unwrap_or_default();
        let selector = PodSelector::for_workload(workload).to_string();
        self.failures.pods.insert((namespace, selector));
        self
    }

    pub fn fail_deletion(mut self, namespace: &str, claim: &str) -> Self {
        self.failures
            .deletes
            .insert((namespace.to_string(), claim.to_string()));
        self
    }

    /// Remove a claim behind the job's back, as a concurrent run would.
    pub fn remove_claim(&self, namespace: &str, name: &str) {
        lock(&self.claims).retain(|claim| !is_object(&claim.metadata, namespace, name));
    }

    /// Names of the claims currently stored in `namespace`.
    pub fn claim_names(&self, namespace: &str) -> Vec<String> {
        lock(&self.claims)
            .iter()
            .filter(|claim| claim.metadata.namespace.as_deref() == Some(namespace))
            .filter_map(|claim| claim.metadata.name.clone())
            .collect()
    }

    /// Every `(namespace, claim)` a delete was requested for, in call order.
    pub fn delete_calls(&self) -> Vec<(String, String)> {
        lock(&self.delete_calls).clone()
    }

    /// Every `(namespace, selector)` pods were listed with, in call order.
    pub fn pod_queries(&self) -> Vec<(String, String)> {
        lock(&self.pod_queries).clone()
    }
}

fn is_object(metadata: &ObjectMeta, namespace: &str, name: &str) -> bool {
    metadata.namespace.as_deref() == Some(namespace) && metadata.name.as_deref() == Some(name)
}

fn injected(resource: &'static str, namespace: Option<&str>) -> Report<KubernetesError> {
    Report::new(KubernetesError::ListFailed {
        resource,
        namespace: namespace.map(str::to_string),
    })
    .attach_printable("injected failure")
}

#[async_trait]
impl ClusterInventory for InMemoryCluster {
    async fn list_storage_classes(&self) -> Result<Vec<StorageClass>, Report<KubernetesError>> {
        if self.failures.storage_classes {
            return Err(injected("storageclasses", None));
        }
        Ok(self.storage_classes.clone())
    }

    async fn list_claims(
        &self,
        namespace: &str,
    ) -> Result<Vec<PersistentVolumeClaim>, Report<KubernetesError>> {
        if self.failures.claims.contains(namespace) {
            return Err(injected("persistentvolumeclaims", Some(namespace)));
        }
        Ok(lock(&self.claims)
            .iter()
            .filter(|claim| claim.metadata.namespace.as_deref() == Some(namespace))
            .cloned()
            .collect())
    }

    async fn list_workloads(
        &self,
        namespace: &str,
    ) -> Result<Vec<StatefulSet>, Report<KubernetesError>> {
        if self.failures.workloads.contains(namespace) {
            return Err(injected("statefulsets", Some(namespace)));
        }
        Ok(self
            .workloads
            .iter()
            .filter(|sts| sts.metadata.namespace.as_deref() == Some(namespace))
            .cloned()
            .collect())
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &PodSelector,
    ) -> Result<Vec<Pod>, Report<KubernetesError>> {
        let query = (namespace.to_string(), selector.to_string());
        lock(&self.pod_queries).push(query.clone());
        if self.failures.pods.contains(&query) {
            return Err(injected("pods", Some(namespace)));
        }
        Ok(self
            .pods
            .iter()
            .filter(|pod| pod.metadata.namespace.as_deref() == Some(namespace))
            .filter(|pod| selector.matches(&pod.metadata.labels.clone().unwrap_or_default()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ClaimStore for InMemoryCluster {
    async fn delete_claim(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DeleteResult, Report<KubernetesError>> {
        lock(&self.delete_calls).push((namespace.to_string(), name.to_string()));

        if self
            .failures
            .deletes
            .contains(&(namespace.to_string(), name.to_string()))
        {
            return Err(Report::new(KubernetesError::DeleteFailed {
                claim: name.to_string(),
                namespace: namespace.to_string(),
            })
            .attach_printable("injected failure"));
        }

        let mut claims = lock(&self.claims);
        let before = claims.len();
        claims.retain(|claim| !is_object(&claim.metadata, namespace, name));
        if claims.len() < before {
            Ok(DeleteResult::Deleted)
        } else {
            Ok(DeleteResult::NotFound)
        }
    }
}

fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn metadata(namespace: Option<&str>, name: &str, labels: &[(&str, &str)]) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        labels: (!labels.is_empty()).then(|| string_map(labels)),
        ..Default::default()
    }
}

/// Storage class with the given annotations and parameters.
pub fn storage_class(
    name: &str,
    provisioner: &str,
    annotations: &[(&str, &str)],
    parameters: &[(&str, &str)],
) -> StorageClass {
    StorageClass {
        metadata: ObjectMeta {
            annotations: (!annotations.is_empty()).then(|| string_map(annotations)),
            ..metadata(None, name, &[])
        },
        provisioner: provisioner.to_string(),
        parameters: (!parameters.is_empty()).then(|| string_map(parameters)),
        ..Default::default()
    }
}

/// Claim bound to `storage_class`, or with no storage class name when `None`.
pub fn claim(
    namespace: &str,
    name: &str,
    storage_class: Option<&str>,
    labels: &[(&str, &str)],
) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: metadata(Some(namespace), name, labels),
        spec: Some(PersistentVolumeClaimSpec {
            storage_class_name: storage_class.map(str::to_string),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// StatefulSet selecting its pods by `match_labels`.
pub fn statefulset(namespace: &str, name: &str, match_labels: &[(&str, &str)]) -> StatefulSet {
    StatefulSet {
        metadata: metadata(Some(namespace), name, &[]),
        spec: Some(StatefulSetSpec {
            selector: LabelSelector {
                match_labels: (!match_labels.is_empty()).then(|| string_map(match_labels)),
                ..Default::default()
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Pod mounting each of `claims` through a persistentVolumeClaim volume.
pub fn pod(namespace: &str, name: &str, labels: &[(&str, &str)], claims: &[&str]) -> Pod {
    let volumes = claims
        .iter()
        .enumerate()
        .map(|(i, claim)| Volume {
            name: format!("data-{i}"),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: claim.to_string(),
                read_only: None,
            }),
            ..Default::default()
        })
        .collect();

    Pod {
        metadata: metadata(Some(namespace), name, labels),
        spec: Some(PodSpec {
            volumes: Some(volumes),
            ..Default::default()
        }),
        ..Default::default()
    }
}
