use std::collections::BTreeMap;

use serde::Serialize;

/// Liveness verdict for one workload-owned claim within a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingStatus {
    pub is_dangling: bool,
    pub labels: BTreeMap<String, String>,
}

/// Claim name -> dangling status, ordered by claim name.
pub type DanglingStatusMap = BTreeMap<String, DanglingStatus>;

/// What happened to a claim the correlator marked dangling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeletionOutcome {
    Deleted,
    AlreadyAbsent,
    Failed { reason: String },
    /// Dry run: the claim was identified but no delete was issued.
    Skipped,
}

impl DeletionOutcome {
    /// Deletion reached its goal: the claim no longer exists.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Deleted | Self::AlreadyAbsent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimOutcome {
    pub claim: String,
    #[serde(flatten)]
    pub outcome: DeletionOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceReport {
    pub namespace: String,
    pub statuses: DanglingStatusMap,
    pub outcomes: Vec<ClaimOutcome>,
}

impl NamespaceReport {
    /// Names of the claims marked dangling, in name order.
    pub fn dangling_claims(&self) -> Vec<&str> {
        self.statuses
            .iter()
            .filter(|(_, status)| status.is_dangling)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn deleted_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, DeletionOutcome::Deleted))
    }

    pub fn already_absent_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, DeletionOutcome::AlreadyAbsent))
    }

    /// Claims that no longer exist: deleted now or already absent.
    pub fn succeeded_count(&self) -> usize {
        self.count(DeletionOutcome::is_success)
    }

    pub fn failed_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, DeletionOutcome::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&DeletionOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|claim| predicate(&claim.outcome))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub eligible_storage_classes: Vec<String>,
    pub namespaces: Vec<NamespaceReport>,
}
