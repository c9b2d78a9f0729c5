//! Traits for the cluster collaborators of the cleanup job

use async_trait::async_trait;
use error_stack::Report;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::storage::v1::StorageClass;

use super::selector::PodSelector;
use crate::platform::k8s::DeleteResult;
use crate::platform::k8s::KubernetesError;

/// Read access to the cluster objects the detection works on
#[async_trait]
pub trait ClusterInventory: Send + Sync {
    /// List every storage class in the cluster
    async fn list_storage_classes(&self) -> Result<Vec<StorageClass>, Report<KubernetesError>>;

    /// List every claim in a namespace
    async fn list_claims(
        &self,
        namespace: &str,
    ) -> Result<Vec<PersistentVolumeClaim>, Report<KubernetesError>>;

    /// List every StatefulSet in a namespace
    async fn list_workloads(
        &self,
        namespace: &str,
    ) -> Result<Vec<StatefulSet>, Report<KubernetesError>>;

    /// List the pods of a namespace matched by `selector`
    async fn list_pods(
        &self,
        namespace: &str,
        selector: &PodSelector,
    ) -> Result<Vec<Pod>, Report<KubernetesError>>;
}

/// The single mutation the job performs against the cluster
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Delete a claim by name. A missing claim is reported as
    /// [`DeleteResult::NotFound`], not as an error.
    async fn delete_claim(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DeleteResult, Report<KubernetesError>>;
}
