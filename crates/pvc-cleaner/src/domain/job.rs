//! One-shot cleanup run over every configured namespace

use error_stack::Report;
use tracing::info;
use tracing::warn;

use super::cleanup::CleanupExecutor;
use super::error::CleanupError;
use super::liveness::LivenessCorrelator;
use super::ownership::OwnershipClassifier;
use super::storage_class_filter::EligibleStorageClasses;
use super::storage_class_filter::StorageClassFilter;
use super::traits::ClaimStore;
use super::traits::ClusterInventory;
use super::types::JobReport;
use super::types::NamespaceReport;
use crate::config::CleanupConfig;

/// Wires the detection stages together: eligible storage classes, then
/// workload-owned claims, then liveness, then deletion.
pub struct CleanupJob<'a, I: ?Sized, S: ?Sized> {
    inventory: &'a I,
    store: &'a S,
    config: &'a CleanupConfig,
}

impl<'a, I, S> CleanupJob<'a, I, S>
where
    I: ClusterInventory + ?Sized,
    S: ClaimStore + ?Sized,
{
    pub fn new(inventory: &'a I, store: &'a S, config: &'a CleanupConfig) -> Self {
        Self {
            inventory,
            store,
            config,
        }
    }

    /// Run the job once.
    ///
    /// Namespaces are processed one after another; nothing that happens in one
    /// namespace keeps the next from being attempted.
    ///
    /// # Errors
    ///
    /// - [`CleanupError::NoEligibleStorageClass`] if no storage class opted in;
    ///   no namespace is touched in that case
    pub async fn run(&self) -> Result<JobReport, Report<CleanupError>> {
        let eligible = self.eligible_storage_classes().await?;

        let mut namespaces = Vec::with_capacity(self.config.namespaces.len());
        for namespace in &self.config.namespaces {
            let report = self.process_namespace(namespace, &eligible).await;
            log_summary(&report);
            namespaces.push(report);
        }

        Ok(JobReport {
            eligible_storage_classes: eligible.into_keys().collect(),
            namespaces,
        })
    }

    async fn eligible_storage_classes(
        &self,
    ) -> Result<EligibleStorageClasses, Report<CleanupError>> {
        let storage_classes = match self.inventory.list_storage_classes().await {
            Ok(storage_classes) => storage_classes,
            Err(e) => {
                warn!("Failed to list storage classes: {e:?}");
                Vec::new()
            }
        };

        let eligible = StorageClassFilter::from_config(self.config).select(storage_classes);
        if eligible.is_empty() {
            return Err(Report::new(CleanupError::NoEligibleStorageClass {
                provisioners: self.config.provisioners.iter().cloned().collect(),
                annotation: self.config.annotation_key.clone(),
            }));
        }

        for name in eligible.keys() {
            info!(storage_class = %name, "Storage class opted into dangling PVC cleanup");
        }
        Ok(eligible)
    }

    #[tracing::instrument(skip(self, eligible))]
    pub async fn process_namespace(
        &self,
        namespace: &str,
        eligible: &EligibleStorageClasses,
    ) -> NamespaceReport {
        let claims = match self.inventory.list_claims(namespace).await {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Failed to list PVCs: {e:?}");
                Vec::new()
            }
        };

        let classifier = OwnershipClassifier::new(eligible, &self.config.selector_parameter);
        let candidates = classifier.claims_of_eligible_classes(claims);
        let owned = classifier.workload_owned_claims(candidates);
        info!(owned = owned.len(), "Found StatefulSet PVCs on eligible storage classes");

        let statuses = LivenessCorrelator::new(self.inventory)
            .correlate(namespace, &owned)
            .await;
        let outcomes = CleanupExecutor::new(self.store, self.config.dry_run)
            .delete_dangling(namespace, &statuses)
            .await;

        NamespaceReport {
            namespace: namespace.to_string(),
            statuses,
            outcomes,
        }
    }
}

fn log_summary(report: &NamespaceReport) {
    info!(
        namespace = %report.namespace,
        tracked = report.statuses.len(),
        dangling = ?report.dangling_claims(),
        deleted = report.deleted_count(),
        already_absent = report.already_absent_count(),
        succeeded = report.succeeded_count(),
        failed = report.failed_count(),
        "Namespace cleanup finished"
    );
}
