//! Kubernetes integration module.
//!
//! The main components are:
//! - [`KubeCluster`]: inventory queries and claim deletion against the API server
//! - [`KubernetesError`]: failures reported by those calls
//! - [`DeleteResult`]: the non-error outcomes of a claim deletion

pub mod cluster;
pub mod types;

pub use cluster::KubeCluster;
pub use types::DeleteResult;
pub use types::KubernetesError;
