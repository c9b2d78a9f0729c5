pub mod cli;

use std::collections::BTreeSet;

pub use cli::Cli;

/// Storage class annotation whose value `"true"` opts a class into cleanup.
pub const DEFAULT_DELETE_ANNOTATION: &str = "openebs.io/delete-dangling-pvc";

/// Storage class parameter holding the name of the StatefulSet ownership label.
pub const DEFAULT_SELECTOR_PARAMETER: &str = "sts-pvc-selector";

/// Settings the cleanup job runs with, resolved once before the run.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub provisioners: BTreeSet<String>,
    pub annotation_key: String,
    pub selector_parameter: String,
    /// Target namespaces in processing order, without duplicates.
    pub namespaces: Vec<String>,
    pub dry_run: bool,
}

impl CleanupConfig {
    pub fn new<P, N>(provisioners: P, namespaces: N) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        Self {
            provisioners: clean_values(provisioners).collect(),
            annotation_key: DEFAULT_DELETE_ANNOTATION.to_string(),
            selector_parameter: DEFAULT_SELECTOR_PARAMETER.to_string(),
            namespaces: dedup_in_order(clean_values(namespaces)),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl From<&Cli> for CleanupConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            annotation_key: cli.annotation_key.trim().to_string(),
            selector_parameter: cli.selector_parameter.trim().to_string(),
            ..Self::new(&cli.provisioners, &cli.namespaces)
        }
        .with_dry_run(cli.dry_run)
    }
}

fn clean_values<I>(values: I) -> impl Iterator<Item = String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    values
        .into_iter()
        .map(|value| value.as_ref().trim().to_string())
        .filter(|value| !value.is_empty())
}

fn dedup_in_order(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    values.filter(|value| seen.insert(value.clone())).collect()
}
