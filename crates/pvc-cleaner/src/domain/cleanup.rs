//! Deletes the claims the liveness correlation left dangling

use error_stack::FrameKind;
use error_stack::Report;
use tracing::error;
use tracing::info;

use super::traits::ClaimStore;
use super::types::ClaimOutcome;
use super::types::DanglingStatusMap;
use super::types::DeletionOutcome;
use crate::platform::k8s::DeleteResult;
use crate::platform::k8s::KubernetesError;

pub struct CleanupExecutor<'a, S: ?Sized> {
    store: &'a S,
    dry_run: bool,
}

impl<'a, S> CleanupExecutor<'a, S>
where
    S: ClaimStore + ?Sized,
{
    pub fn new(store: &'a S, dry_run: bool) -> Self {
        Self { store, dry_run }
    }

    /// Request deletion of every dangling claim, in claim-name order.
    ///
    /// Each claim gets its own outcome; a failed deletion never stops the
    /// remaining ones.
    pub async fn delete_dangling(
        &self,
        namespace: &str,
        statuses: &DanglingStatusMap,
    ) -> Vec<ClaimOutcome> {
        let mut outcomes = Vec::new();
        for (claim, _) in statuses.iter().filter(|(_, status)| status.is_dangling) {
            let outcome = self.delete_one(namespace, claim).await;
            outcomes.push(ClaimOutcome {
                claim: claim.clone(),
                outcome,
            });
        }
        outcomes
    }

    async fn delete_one(&self, namespace: &str, claim: &str) -> DeletionOutcome {
        if self.dry_run {
            info!(
                namespace = %namespace,
                claim = %claim,
                "Dangling PVC found, dry run: not deleting"
            );
            return DeletionOutcome::Skipped;
        }

        match self.store.delete_claim(namespace, claim).await {
            Ok(DeleteResult::Deleted) => {
                info!(namespace = %namespace, claim = %claim, "Dangling PVC deleted");
                DeletionOutcome::Deleted
            }
            Ok(DeleteResult::NotFound) => {
                info!(namespace = %namespace, claim = %claim, "Dangling PVC already absent");
                DeletionOutcome::AlreadyAbsent
            }
            Err(e) => {
                error!(
                    namespace = %namespace,
                    claim = %claim,
                    "Failed to delete dangling PVC: {e:?}"
                );
                DeletionOutcome::Failed {
                    reason: failure_reason(&e),
                }
            }
        }
    }
}

/// Every context of the report, outermost first, joined with `": "`.
fn failure_reason(report: &Report<KubernetesError>) -> String {
    report
        .frames()
        .filter_map(|frame| match frame.kind() {
            FrameKind::Context(context) => Some(context.to_string()),
            FrameKind::Attachment(_) => None,
        })
        .collect::<Vec<_>>()
        .join(": ")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;
    use crate::domain::mock::claim;
    use crate::domain::mock::InMemoryCluster;
    use crate::domain::types::DanglingStatus;

    const NS: &str = "default";

    fn statuses(entries: &[(&str, bool)]) -> DanglingStatusMap {
        entries
            .iter()
            .map(|(name, is_dangling)| {
                (
                    name.to_string(),
                    DanglingStatus {
                        is_dangling: *is_dangling,
                        labels: BTreeMap::new(),
                    },
                )
            })
            .collect()
    }

    fn outcome(claim: &str, outcome: DeletionOutcome) -> ClaimOutcome {
        ClaimOutcome {
            claim: claim.to_string(),
            outcome,
        }
    }

    fn cluster_with(names: &[&str]) -> InMemoryCluster {
        names.iter().fold(InMemoryCluster::new(), |cluster, name| {
            cluster.with_claim(claim(NS, name, Some("sc1"), &[("role", "true")]))
        })
    }

    #[test(tokio::test)]
    async fn deletes_only_dangling_claims() {
        let cluster = cluster_with(&["pvc-bound", "pvc-unbound"]);

        let outcomes = CleanupExecutor::new(&cluster, false)
            .delete_dangling(NS, &statuses(&[("pvc-bound", false), ("pvc-unbound", true)]))
            .await;

        assert_eq!(outcomes, vec![outcome("pvc-unbound", DeletionOutcome::Deleted)]);
        assert_eq!(cluster.claim_names(NS), vec!["pvc-bound".to_string()]);
    }

    #[test(tokio::test)]
    async fn already_absent_is_success_and_continues() {
        let cluster = cluster_with(&["pvc-next", "pvc-unbound"]);
        cluster.remove_claim(NS, "pvc-unbound");

        let outcomes = CleanupExecutor::new(&cluster, false)
            .delete_dangling(NS, &statuses(&[("pvc-unbound", true), ("pvc-next", true)]))
            .await;

        assert_eq!(
            outcomes,
            vec![
                outcome("pvc-next", DeletionOutcome::Deleted),
                outcome("pvc-unbound", DeletionOutcome::AlreadyAbsent),
            ]
        );
        assert!(outcomes.iter().all(|o| o.outcome.is_success()));
    }

    #[test(tokio::test)]
    async fn failure_does_not_stop_remaining_deletions() {
        let cluster = cluster_with(&["pvc-a", "pvc-b", "pvc-c"]).fail_deletion(NS, "pvc-a");

        let outcomes = CleanupExecutor::new(&cluster, false)
            .delete_dangling(
                NS,
                &statuses(&[("pvc-a", true), ("pvc-b", true), ("pvc-c", true)]),
            )
            .await;

        assert_eq!(
            outcomes,
            vec![
                outcome(
                    "pvc-a",
                    DeletionOutcome::Failed {
                        reason: "Failed to delete claim pvc-a in namespace default".to_string(),
                    }
                ),
                outcome("pvc-b", DeletionOutcome::Deleted),
                outcome("pvc-c", DeletionOutcome::Deleted),
            ]
        );
        assert_eq!(cluster.claim_names(NS), vec!["pvc-a".to_string()]);
    }

    #[test]
    fn failure_reason_carries_the_root_cause() {
        let report = Report::new(std::io::Error::other("persistentvolumeclaims is forbidden"))
            .change_context(KubernetesError::DeleteFailed {
                claim: "pvc-a".to_string(),
                namespace: NS.to_string(),
            })
            .attach_printable("not part of the reason");

        assert_eq!(
            failure_reason(&report),
            "Failed to delete claim pvc-a in namespace default: \
             persistentvolumeclaims is forbidden"
        );
    }

    #[test(tokio::test)]
    async fn dry_run_issues_no_deletes() {
        let cluster = cluster_with(&["pvc-unbound"]);

        let outcomes = CleanupExecutor::new(&cluster, true)
            .delete_dangling(NS, &statuses(&[("pvc-unbound", true)]))
            .await;

        assert_eq!(outcomes, vec![outcome("pvc-unbound", DeletionOutcome::Skipped)]);
        assert!(cluster.delete_calls().is_empty());
        assert_eq!(cluster.claim_names(NS), vec!["pvc-unbound".to_string()]);
    }

    #[test(tokio::test)]
    async fn each_claim_deleted_once() {
        let cluster = cluster_with(&["pvc-a"]);

        CleanupExecutor::new(&cluster, false)
            .delete_dangling(NS, &statuses(&[("pvc-a", true)]))
            .await;

        assert_eq!(
            cluster.delete_calls(),
            vec![(NS.to_string(), "pvc-a".to_string())]
        );
    }
}
