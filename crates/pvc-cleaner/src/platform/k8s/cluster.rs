use std::fmt::Debug;
use std::path::Path;

use async_trait::async_trait;
use error_stack::Report;
use error_stack::ResultExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::DeleteParams;
use kube::api::ListParams;
use kube::Api;
use kube::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::selector::PodSelector;
use crate::domain::traits::ClaimStore;
use crate::domain::traits::ClusterInventory;
use crate::platform::k8s::DeleteResult;
use crate::platform::k8s::KubernetesError;
use crate::platform::kube_client;

/// Inventory and claim store backed by the Kubernetes API server.
///
/// Holds the client explicitly so every component receives it by reference
/// instead of reaching for process-wide state.
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using an explicit kubeconfig, or the in-cluster configuration.
    ///
    /// # Errors
    ///
    /// - [`KubernetesError::ConnectionFailed`] if no usable configuration is found
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self, Report<KubernetesError>> {
        Ok(Self::new(kube_client::init_kube_client(kubeconfig).await?))
    }
}

async fn list_objects<K>(
    api: Api<K>,
    params: &ListParams,
    resource: &'static str,
    namespace: Option<&str>,
) -> Result<Vec<K>, Report<KubernetesError>>
where
    K: Clone + DeserializeOwned + Debug,
{
    let list = api
        .list(params)
        .await
        .change_context(KubernetesError::ListFailed {
            resource,
            namespace: namespace.map(str::to_string),
        })?;

    debug!(resource, namespace, count = list.items.len(), "Listed objects");
    Ok(list.items)
}

#[async_trait]
impl ClusterInventory for KubeCluster {
    async fn list_storage_classes(&self) -> Result<Vec<StorageClass>, Report<KubernetesError>> {
        let api: Api<StorageClass> = Api::all(self.client.clone());
        list_objects(api, &ListParams::default(), "storageclasses", None).await
    }

    async fn list_claims(
        &self,
        namespace: &str,
    ) -> Result<Vec<PersistentVolumeClaim>, Report<KubernetesError>> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        list_objects(
            api,
            &ListParams::default(),
            "persistentvolumeclaims",
            Some(namespace),
        )
        .await
    }

    async fn list_workloads(
        &self,
        namespace: &str,
    ) -> Result<Vec<StatefulSet>, Report<KubernetesError>> {
        let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
        list_objects(api, &ListParams::default(), "statefulsets", Some(namespace)).await
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &PodSelector,
    ) -> Result<Vec<Pod>, Report<KubernetesError>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(&selector.to_string());
        list_objects(api, &params, "pods", Some(namespace))
            .await
            .attach_printable_lazy(|| format!("label selector: {selector}"))
    }
}

#[async_trait]
impl ClaimStore for KubeCluster {
    async fn delete_claim(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DeleteResult, Report<KubernetesError>> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        delete_result(
            api.delete(name, &DeleteParams::default()).await,
            namespace,
            name,
        )
    }
}

/// Map the API server's answer to a delete request. A 404 means the claim is
/// already gone.
fn delete_result<T>(
    result: kube::Result<T>,
    namespace: &str,
    name: &str,
) -> Result<DeleteResult, Report<KubernetesError>> {
    match result {
        Ok(_) => Ok(DeleteResult::Deleted),
        Err(kube::Error::Api(response)) if response.code == 404 => Ok(DeleteResult::NotFound),
        Err(e) => Err(Report::new(e).change_context(KubernetesError::DeleteFailed {
            claim: name.to_string(),
            namespace: namespace.to_string(),
        })),
    }
}
