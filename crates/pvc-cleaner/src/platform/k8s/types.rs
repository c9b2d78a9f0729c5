use thiserror::Error;

/// Errors that can occur during Kubernetes operations.
#[derive(Debug, Error)]
pub enum KubernetesError {
    #[error("Failed to connect to Kubernetes API: {message}")]
    ConnectionFailed { message: String },
    #[error(
        "Failed to list {resource} in {}",
        .namespace.as_deref().map_or("cluster scope".to_string(), |ns| format!("namespace {ns}"))
    )]
    ListFailed {
        resource: &'static str,
        namespace: Option<String>,
    },
    #[error("Failed to delete claim {claim} in namespace {namespace}")]
    DeleteFailed { claim: String, namespace: String },
}

/// Result of a claim deletion that reached the API server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResult {
    Deleted,
    /// The claim was already gone, e.g. removed by a concurrent run.
    NotFound,
}
