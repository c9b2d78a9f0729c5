use std::path::PathBuf;

use clap::Parser;
use utils::version;

use crate::config::DEFAULT_DELETE_ANNOTATION;
use crate::config::DEFAULT_SELECTOR_PARAMETER;

/// Deletes StatefulSet PVCs that no live pod references anymore
#[derive(Parser, Debug)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[arg(
        long,
        env = "PROVISIONERS",
        value_delimiter = ',',
        required = true,
        help = "Comma-separated provisioners whose storage classes may be cleaned, e.g. openebs.io/local"
    )]
    pub provisioners: Vec<String>,

    #[arg(
        long,
        env = "NAMESPACES",
        value_delimiter = ',',
        required = true,
        help = "Comma-separated namespaces to scan for dangling PVCs"
    )]
    pub namespaces: Vec<String>,

    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (defaults to cluster config or ~/.kube/config)"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        long,
        env = "DELETE_ANNOTATION_KEY",
        default_value = DEFAULT_DELETE_ANNOTATION,
        help = "Storage class annotation that must be \"true\" to opt into cleanup"
    )]
    pub annotation_key: String,

    #[arg(
        long,
        env = "STS_PVC_SELECTOR_PARAMETER",
        default_value = DEFAULT_SELECTOR_PARAMETER,
        help = "Storage class parameter naming the label that marks StatefulSet PVCs"
    )]
    pub selector_parameter: String,

    #[arg(
        long,
        env = "DRY_RUN",
        help = "Report dangling PVCs without deleting them",
        default_value_t = false,
        action = clap::ArgAction::Set
    )]
    pub dry_run: bool,

    #[arg(
        long,
        env = "JSON_REPORT",
        help = "Print the job report as JSON on stdout",
        default_value_t = false,
        action = clap::ArgAction::Set
    )]
    pub json_report: bool,
}
