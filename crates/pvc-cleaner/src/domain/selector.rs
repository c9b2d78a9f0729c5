//! Pod selectors derived from StatefulSet match labels

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::apps::v1::StatefulSet;

/// Equality-based label selector: a pod matches only if it carries every
/// key/value pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodSelector {
    match_labels: BTreeMap<String, String>,
}

impl PodSelector {
    pub fn new(match_labels: BTreeMap<String, String>) -> Self {
        Self { match_labels }
    }

    /// Selector built from the complete `spec.selector.matchLabels` of a workload.
    ///
    /// Every pair is kept. Picking a single key would also match pods of other
    /// workloads that share that one label.
    pub fn for_workload(workload: &StatefulSet) -> Self {
        let match_labels = workload
            .spec
            .as_ref()
            .and_then(|spec| spec.selector.match_labels.clone())
            .unwrap_or_default();
        Self::new(match_labels)
    }

    /// An empty selector would match every pod, so it is treated as matching none.
    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        !self.is_empty()
            && self
                .match_labels
                .iter()
                .all(|(key, value)| labels.get(key) == Some(value))
    }
}

/// Renders in the API server's `labelSelector` syntax, e.g. `app=db,role=true`.
impl fmt::Display for PodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.match_labels.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::apps::v1::StatefulSetSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
    use similar_asserts::assert_eq;

    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn statefulset(match_labels: Option<BTreeMap<String, String>>) -> StatefulSet {
        StatefulSet {
            spec: Some(StatefulSetSpec {
                selector: LabelSelector {
                    match_labels,
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn renders_all_pairs_in_key_order() {
        let selector = PodSelector::new(labels(&[("role", "true"), ("app", "db")]));
        assert_eq!(selector.to_string(), "app=db,role=true");
    }

    #[test]
    fn requires_every_pair() {
        let selector = PodSelector::new(labels(&[("app", "db"), ("role", "true")]));

        assert!(selector.matches(&labels(&[("app", "db"), ("role", "true"), ("x", "y")])));
        assert!(!selector.matches(&labels(&[("app", "db")])));
        assert!(!selector.matches(&labels(&[("app", "db"), ("role", "false")])));
    }

    #[test]
    fn empty_selector_matches_nothing() {
        let selector = PodSelector::default();
        assert!(selector.is_empty());
        assert!(!selector.matches(&labels(&[("app", "db")])));
        assert!(!selector.matches(&BTreeMap::new()));
    }

    #[test]
    fn for_workload_keeps_full_match_labels() {
        let sts = statefulset(Some(labels(&[("app", "db"), ("tier", "storage")])));
        assert_eq!(
            PodSelector::for_workload(&sts),
            PodSelector::new(labels(&[("app", "db"), ("tier", "storage")]))
        );
    }

    #[test]
    fn for_workload_without_match_labels_is_empty() {
        assert!(PodSelector::for_workload(&statefulset(None)).is_empty());
        assert!(PodSelector::for_workload(&StatefulSet::default()).is_empty());
    }
}
