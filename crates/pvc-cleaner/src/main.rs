use anyhow::Result;
use clap::Parser;
use pvc_cleaner::config::CleanupConfig;
use pvc_cleaner::config::Cli;
use pvc_cleaner::domain::JobReport;
use pvc_cleaner::k8s::KubeCluster;
use pvc_cleaner::CleanupJob;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();
    let _guard = utils::logging::init();

    tracing::info!("Starting dangling PVC cleaner {}", &**version::VERSION);

    let config = CleanupConfig::from(&cli);
    tracing::info!(
        provisioners = ?config.provisioners,
        namespaces = ?config.namespaces,
        dry_run = config.dry_run,
        "Resolved configuration"
    );

    let cluster = KubeCluster::connect(cli.kubeconfig.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to Kubernetes: {e:?}");
            anyhow::anyhow!("{}", e.current_context())
        })?;

    let report = CleanupJob::new(&cluster, &cluster, &config)
        .run()
        .await
        .map_err(|e| {
            tracing::error!("Cleanup aborted: {e:?}");
            anyhow::anyhow!("{}", e.current_context())
        })?;

    if cli.json_report {
        print_report(&report)?;
    }

    tracing::info!(
        namespaces = report.namespaces.len(),
        succeeded = report
            .namespaces
            .iter()
            .map(|ns| ns.succeeded_count())
            .sum::<usize>(),
        failed = report
            .namespaces
            .iter()
            .map(|ns| ns.failed_count())
            .sum::<usize>(),
        "Dangling PVC cleanup finished"
    );
    Ok(())
}

fn print_report(report: &JobReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}
