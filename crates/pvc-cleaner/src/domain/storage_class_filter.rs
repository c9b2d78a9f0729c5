//! Selects the storage classes that opted into dangling PVC cleanup

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use k8s_openapi::api::storage::v1::StorageClass;

use crate::config::CleanupConfig;

/// Eligible storage classes keyed by name.
pub type EligibleStorageClasses = BTreeMap<String, StorageClass>;

/// Value the opt-in annotation must carry, compared case-sensitively.
const OPT_IN_VALUE: &str = "true";

pub struct StorageClassFilter<'a> {
    provisioners: &'a BTreeSet<String>,
    annotation_key: &'a str,
}

impl<'a> StorageClassFilter<'a> {
    pub fn new(provisioners: &'a BTreeSet<String>, annotation_key: &'a str) -> Self {
        Self {
            provisioners,
            annotation_key,
        }
    }

    pub fn from_config(config: &'a CleanupConfig) -> Self {
        Self::new(&config.provisioners, &config.annotation_key)
    }

    /// A class is eligible iff its provisioner is accepted and the opt-in
    /// annotation is exactly `"true"`.
    pub fn is_eligible(&self, storage_class: &StorageClass) -> bool {
        self.provisioners.contains(&storage_class.provisioner)
            && storage_class
                .metadata
                .annotations
                .as_ref()
                .and_then(|annotations| annotations.get(self.annotation_key))
                .is_some_and(|value| value == OPT_IN_VALUE)
    }

    /// Keep the eligible classes. Classes without a name cannot be referenced
    /// by a claim and are dropped.
    pub fn select(&self, storage_classes: Vec<StorageClass>) -> EligibleStorageClasses {
        storage_classes
            .into_iter()
            .filter(|storage_class| self.is_eligible(storage_class))
            .filter_map(|storage_class| {
                let name = storage_class.metadata.name.clone()?;
                Some((name, storage_class))
            })
            .collect()
    }
}
