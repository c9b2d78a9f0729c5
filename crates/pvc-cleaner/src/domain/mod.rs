//! Dangling StatefulSet PVC detection and cleanup.
//!
//! The stages run leaf to root for every target namespace:
//! - [`StorageClassFilter`]: storage classes that opted into cleanup
//! - [`OwnershipClassifier`]: claims created for a StatefulSet on those classes
//! - [`LivenessCorrelator`]: whether a live pod still mounts each claim
//! - [`CleanupExecutor`]: deletion of the claims nothing mounts
//!
//! [`CleanupJob`] drives them over the configured namespaces.

pub mod cleanup;
pub mod error;
pub mod job;
pub mod liveness;
pub mod mock;
pub mod ownership;
pub mod selector;
pub mod storage_class_filter;
pub mod traits;
pub mod types;

pub use cleanup::CleanupExecutor;
pub use error::CleanupError;
pub use job::CleanupJob;
pub use liveness::LivenessCorrelator;
pub use ownership::OwnershipClassifier;
pub use selector::PodSelector;
pub use storage_class_filter::EligibleStorageClasses;
pub use storage_class_filter::StorageClassFilter;
pub use traits::ClaimStore;
pub use traits::ClusterInventory;
pub use types::ClaimOutcome;
pub use types::DanglingStatus;
pub use types::DanglingStatusMap;
pub use types::DeletionOutcome;
pub use types::JobReport;
pub use types::NamespaceReport;
