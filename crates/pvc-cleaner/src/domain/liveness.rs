//! Correlates workload-owned claims with the pods that still mount them

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use k8s_openapi::api::core::v1::Pod;
use tracing::debug;
use tracing::warn;

use super::selector::PodSelector;
use super::traits::ClusterInventory;
use super::types::DanglingStatus;
use super::types::DanglingStatusMap;

/// Every claim starts out dangling.
pub fn initial_statuses(owned_claims: &[PersistentVolumeClaim]) -> DanglingStatusMap {
    owned_claims
        .iter()
        .filter_map(|claim| {
            let name = claim.metadata.name.clone()?;
            let labels = claim.metadata.labels.clone().unwrap_or_default();
            Some((
                name,
                DanglingStatus {
                    is_dangling: true,
                    labels,
                },
            ))
        })
        .collect()
}

/// Claim names mounted by `pod` through persistentVolumeClaim volumes.
pub fn claim_references(pod: &Pod) -> impl Iterator<Item = &str> {
    pod.spec
        .iter()
        .flat_map(|spec| spec.volumes.iter().flatten())
        .filter_map(|volume| volume.persistent_volume_claim.as_ref())
        .map(|source| source.claim_name.as_str())
}

/// Clear the dangling flag of every tracked claim mounted by one of `pods`.
/// Returns how many entries flipped.
pub fn mark_referenced(statuses: &mut DanglingStatusMap, pods: &[Pod]) -> usize {
    let mut flipped = 0;
    for pod in pods {
        for claim_name in claim_references(pod) {
            if let Some(status) = statuses.get_mut(claim_name) {
                if status.is_dangling {
                    status.is_dangling = false;
                    flipped += 1;
                }
            }
        }
    }
    flipped
}

pub struct LivenessCorrelator<'a, I: ?Sized> {
    inventory: &'a I,
}

impl<'a, I> LivenessCorrelator<'a, I>
where
    I: ClusterInventory + ?Sized,
{
    pub fn new(inventory: &'a I) -> Self {
        Self { inventory }
    }

    /// Build the dangling-status map of `owned_claims` in `namespace`.
    ///
    /// Listing failures never abort the correlation: a workload whose pods
    /// cannot be listed contributes no liveness evidence, which leaves its
    /// claims dangling.
    pub async fn correlate(
        &self,
        namespace: &str,
        owned_claims: &[PersistentVolumeClaim],
    ) -> DanglingStatusMap {
        let mut statuses = initial_statuses(owned_claims);
        if statuses.is_empty() {
            return statuses;
        }

        let workloads = match self.inventory.list_workloads(namespace).await {
            Ok(workloads) => workloads,
            Err(e) => {
                warn!(
                    namespace = %namespace,
                    "Failed to list StatefulSets, no liveness evidence: {e:?}"
                );
                Vec::new()
            }
        };

        for workload in &workloads {
            let workload_name = workload.metadata.name.as_deref().unwrap_or("unknown");
            let selector = PodSelector::for_workload(workload);
            if selector.is_empty() {
                debug!(
                    namespace = %namespace,
                    statefulset = %workload_name,
                    "StatefulSet has no match labels, skipping"
                );
                continue;
            }

            let pods = match self.inventory.list_pods(namespace, &selector).await {
                Ok(pods) => pods,
                Err(e) => {
                    warn!(
                        namespace = %namespace,
                        statefulset = %workload_name,
                        selector = %selector,
                        "Failed to list pods, treating StatefulSet as having no live pods: {e:?}"
                    );
                    continue;
                }
            };

            let flipped = mark_referenced(&mut statuses, &pods);
            debug!(
                namespace = %namespace,
                statefulset = %workload_name,
                pods = pods.len(),
                claims_in_use = flipped,
                "Correlated StatefulSet pods"
            );
        }

        statuses
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;
    use crate::domain::mock::claim;
    use crate::domain::mock::pod;
    use crate::domain::mock::statefulset;
    use crate::domain::mock::InMemoryCluster;

    const NS: &str = "default";

    fn dangling(statuses: &DanglingStatusMap) -> BTreeMap<&str, bool> {
        statuses
            .iter()
            .map(|(name, status)| (name.as_str(), status.is_dangling))
            .collect()
    }

    fn owned(names: &[&str]) -> Vec<PersistentVolumeClaim> {
        names
            .iter()
            .map(|name| claim(NS, name, Some("sc1"), &[("role", "true")]))
            .collect()
    }

    #[test]
    fn initial_statuses_keep_labels() {
        let statuses = initial_statuses(&owned(&["pvc-a"]));
        assert_eq!(
            statuses.get("pvc-a"),
            Some(&DanglingStatus {
                is_dangling: true,
                labels: BTreeMap::from([("role".to_string(), "true".to_string())]),
            })
        );
    }

    #[test]
    fn claim_references_skip_other_volume_kinds() {
        let mut p = pod(NS, "p", &[], &["pvc-a", "pvc-b"]);
        if let Some(spec) = p.spec.as_mut() {
            spec.volumes
                .get_or_insert_with(Vec::new)
                .push(k8s_openapi::api::core::v1::Volume {
                    name: "scratch".to_string(),
                    ..Default::default()
                });
        }
        assert_eq!(claim_references(&p).collect::<Vec<_>>(), vec!["pvc-a", "pvc-b"]);
        assert_eq!(claim_references(&Pod::default()).count(), 0);
    }

    #[test]
    fn mark_referenced_ignores_untracked_claims() {
        let mut statuses = initial_statuses(&owned(&["pvc-a"]));
        let flipped = mark_referenced(&mut statuses, &[pod(NS, "p", &[], &["pvc-a", "other"])]);

        assert_eq!(flipped, 1);
        assert_eq!(statuses.len(), 1);
        assert_eq!(dangling(&statuses), BTreeMap::from([("pvc-a", false)]));
    }

    #[test(tokio::test)]
    async fn unreferenced_claim_stays_dangling() {
        let cluster = InMemoryCluster::new();
        let statuses = LivenessCorrelator::new(&cluster)
            .correlate(NS, &owned(&["pvc-unbound"]))
            .await;

        assert_eq!(dangling(&statuses), BTreeMap::from([("pvc-unbound", true)]));
    }

    #[test(tokio::test)]
    async fn mounted_claim_is_live() {
        let cluster = InMemoryCluster::new()
            .with_workload(statefulset(NS, "sts1", &[("role", "true")]))
            .with_pod(pod(NS, "sts1-0", &[("role", "true")], &["pvc-bound"]));

        let statuses = LivenessCorrelator::new(&cluster)
            .correlate(NS, &owned(&["pvc-bound", "pvc-unbound"]))
            .await;

        assert_eq!(
            dangling(&statuses),
            BTreeMap::from([("pvc-bound", false), ("pvc-unbound", true)])
        );
    }

    #[test(tokio::test)]
    async fn selector_uses_every_match_label() {
        // sts-a selects {app: db, shard: a}. A pod labelled only app=db belongs
        // to nobody and must not keep pvc-orphan alive.
        let cluster = InMemoryCluster::new()
            .with_workload(statefulset(NS, "sts-a", &[("app", "db"), ("shard", "a")]))
            .with_pod(pod(NS, "sts-a-0", &[("app", "db"), ("shard", "a")], &["pvc-a"]))
            .with_pod(pod(NS, "stray", &[("app", "db")], &["pvc-orphan"]));

        let statuses = LivenessCorrelator::new(&cluster)
            .correlate(NS, &owned(&["pvc-a", "pvc-orphan"]))
            .await;

        assert_eq!(
            dangling(&statuses),
            BTreeMap::from([("pvc-a", false), ("pvc-orphan", true)])
        );
        assert_eq!(
            cluster.pod_queries(),
            vec![(NS.to_string(), "app=db,shard=a".to_string())]
        );
    }

    #[test(tokio::test)]
    async fn empty_selector_contributes_nothing() {
        let cluster = InMemoryCluster::new()
            .with_workload(statefulset(NS, "no-labels", &[]))
            .with_pod(pod(NS, "p", &[("role", "true")], &["pvc-a"]));

        let statuses = LivenessCorrelator::new(&cluster)
            .correlate(NS, &owned(&["pvc-a"]))
            .await;

        assert_eq!(dangling(&statuses), BTreeMap::from([("pvc-a", true)]));
        assert!(cluster.pod_queries().is_empty());
    }

    #[test(tokio::test)]
    async fn pods_in_other_namespaces_do_not_count() {
        let cluster = InMemoryCluster::new()
            .with_workload(statefulset(NS, "sts1", &[("role", "true")]))
            .with_pod(pod("other", "sts1-0", &[("role", "true")], &["pvc-a"]));

        let statuses = LivenessCorrelator::new(&cluster)
            .correlate(NS, &owned(&["pvc-a"]))
            .await;

        assert_eq!(dangling(&statuses), BTreeMap::from([("pvc-a", true)]));
    }

    #[test(tokio::test)]
    async fn pod_listing_failure_is_isolated() {
        let broken = statefulset(NS, "broken", &[("app", "broken")]);
        let cluster = InMemoryCluster::new()
            .with_workload(broken.clone())
            .with_workload(statefulset(NS, "healthy", &[("app", "healthy")]))
            .with_pod(pod(NS, "broken-0", &[("app", "broken")], &["pvc-broken"]))
            .with_pod(pod(NS, "healthy-0", &[("app", "healthy")], &["pvc-healthy"]))
            .fail_pod_listing_for(&broken);

        let statuses = LivenessCorrelator::new(&cluster)
            .correlate(NS, &owned(&["pvc-broken", "pvc-healthy"]))
            .await;

        assert_eq!(
            dangling(&statuses),
            BTreeMap::from([("pvc-broken", true), ("pvc-healthy", false)])
        );
    }

    #[test(tokio::test)]
    async fn workload_listing_failure_leaves_everything_dangling() {
        let cluster = InMemoryCluster::new()
            .with_workload(statefulset(NS, "sts1", &[("role", "true")]))
            .with_pod(pod(NS, "sts1-0", &[("role", "true")], &["pvc-a"]))
            .fail_workload_listing(NS);

        let statuses = LivenessCorrelator::new(&cluster)
            .correlate(NS, &owned(&["pvc-a"]))
            .await;

        assert_eq!(dangling(&statuses), BTreeMap::from([("pvc-a", true)]));
    }

    #[test(tokio::test)]
    async fn no_owned_claims_skips_listing() {
        let cluster = InMemoryCluster::new()
            .with_workload(statefulset(NS, "sts1", &[("role", "true")]));

        let statuses = LivenessCorrelator::new(&cluster).correlate(NS, &[]).await;

        assert!(statuses.is_empty());
        assert!(cluster.pod_queries().is_empty());
    }

    #[test(tokio::test)]
    async fn correlation_is_idempotent() {
        let cluster = InMemoryCluster::new()
            .with_workload(statefulset(NS, "sts1", &[("role", "true")]))
            .with_pod(pod(NS, "sts1-0", &[("role", "true")], &["pvc-bound"]));
        let claims = owned(&["pvc-bound", "pvc-unbound"]);
        let correlator = LivenessCorrelator::new(&cluster);

        let first = correlator.correlate(NS, &claims).await;
        let second = correlator.correlate(NS, &claims).await;

        assert_eq!(first, second);
    }
}
