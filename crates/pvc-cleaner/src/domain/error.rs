//! Error types for the cleanup job

use thiserror::Error;

/// Failures that abort the whole job.
#[derive(Debug, Error)]
pub enum CleanupError {
    /// No storage class opted into cleanup, so no claim can ever be
    /// classified as workload-owned.
    #[error(
        "No storage class with provisioner in [{}] and annotation {annotation}=\"true\"",
        .provisioners.join(", ")
    )]
    NoEligibleStorageClass {
        provisioners: Vec<String>,
        annotation: String,
    },
}
