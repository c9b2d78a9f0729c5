//! Separates StatefulSet-created claims from hand-made ones
//!
//! Kubernetes copies the StatefulSet selector labels onto the claims it
//! creates from volume claim templates. Once the StatefulSet is gone those
//! labels are the only trace of where a claim came from, so each eligible
//! storage class names (via a parameter) the label that marks its StatefulSet
//! claims.

use k8s_openapi::api::core::v1::PersistentVolumeClaim;

use super::storage_class_filter::EligibleStorageClasses;

/// Value the ownership label must carry, compared case-sensitively.
const OWNED_VALUE: &str = "true";

pub fn claim_storage_class(claim: &PersistentVolumeClaim) -> Option<&str> {
    claim
        .spec
        .as_ref()
        .and_then(|spec| spec.storage_class_name.as_deref())
}

pub struct OwnershipClassifier<'a> {
    eligible: &'a EligibleStorageClasses,
    selector_parameter: &'a str,
}

impl<'a> OwnershipClassifier<'a> {
    pub fn new(eligible: &'a EligibleStorageClasses, selector_parameter: &'a str) -> Self {
        Self {
            eligible,
            selector_parameter,
        }
    }

    /// Claims whose storage class is eligible.
    pub fn claims_of_eligible_classes(
        &self,
        claims: Vec<PersistentVolumeClaim>,
    ) -> Vec<PersistentVolumeClaim> {
        claims
            .into_iter()
            .filter(|claim| {
                claim_storage_class(claim).is_some_and(|name| self.eligible.contains_key(name))
            })
            .collect()
    }

    /// Label key marking StatefulSet claims of `storage_class`, if configured.
    pub fn ownership_label(&self, storage_class: &str) -> Option<&'a str> {
        self.eligible
            .get(storage_class)?
            .parameters
            .as_ref()?
            .get(self.selector_parameter)
            .map(String::as_str)
    }

    pub fn is_workload_owned(&self, claim: &PersistentVolumeClaim) -> bool {
        let Some(label) = claim_storage_class(claim).and_then(|sc| self.ownership_label(sc)) else {
            return false;
        };
        claim
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(label))
            .is_some_and(|value| value == OWNED_VALUE)
    }

    /// Workload-owned claims among `claims`. Everything else is user-managed
    /// and never becomes a deletion candidate.
    pub fn workload_owned_claims(
        &self,
        claims: Vec<PersistentVolumeClaim>,
    ) -> Vec<PersistentVolumeClaim> {
        claims
            .into_iter()
            .filter(|claim| self.is_workload_owned(claim))
            .collect()
    }
}
