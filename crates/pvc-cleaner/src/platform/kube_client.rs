use std::path::Path;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;
use tracing::info;

use crate::platform::k8s::KubernetesError;

/// Build a client from an explicit kubeconfig file, or infer one from the
/// in-cluster service account (falling back to `~/.kube/config`).
pub async fn init_kube_client(
    kubeconfig: Option<&Path>,
) -> Result<Client, Report<KubernetesError>> {
    let config = match kubeconfig {
        Some(path) => load_kubeconfig(path).await?,
        None => Config::infer()
            .await
            .change_context(KubernetesError::ConnectionFailed {
                message: "Failed to infer in-cluster or local kubeconfig".to_string(),
            })?,
    };

    info!(cluster_url = %config.cluster_url, "Connecting to Kubernetes API");

    Client::try_from(config).change_context(KubernetesError::ConnectionFailed {
        message: "Failed to create Kubernetes client".to_string(),
    })
}

async fn load_kubeconfig(path: &Path) -> Result<Config, Report<KubernetesError>> {
    let kubeconfig =
        Kubeconfig::read_from(path).change_context(KubernetesError::ConnectionFailed {
            message: format!("Failed to read kubeconfig file: {}", path.display()),
        })?;

    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .change_context(KubernetesError::ConnectionFailed {
            message: format!("Failed to create config from kubeconfig: {}", path.display()),
        })
}
