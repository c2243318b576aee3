//! Kepler must-gather
//!
//! Collects a diagnostic bundle for the Kepler operator: OLM state, the
//! operator's install objects, Kepler resources, exporter pod diagnostics
//! and a user-workload monitoring snapshot.

mod output;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use gather_lib::{layout, prepare_destination, CliClient, CollectionTarget, GatherConfig, Orchestrator};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Collect a diagnostic bundle for the Kepler operator
#[derive(Parser, Debug)]
#[command(name = "must-gather")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Namespace the operator is installed in
    #[arg(short = 'n', long = "ns", default_value = "openshift-operators")]
    pub ns: String,

    /// Operator name, as used in its OLM labels
    #[arg(short = 'o', long = "operator", default_value = "kepler-operator")]
    pub operator: String,

    /// Directory the bundle is written to
    #[arg(short = 'd', long = "dest-dir", default_value = "/must-gather")]
    pub dest_dir: PathBuf,

    /// Path to kubeconfig file (the CLI tool otherwise honors KUBECONFIG itself)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,
}

fn parse_args() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => std::process::exit(0),
                _ => std::process::exit(1),
            }
        }
    }
}

/// Console logging plus a plain-text copy in the bundle
fn init_tracing(log_path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("opening debug log {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_args();

    let target = CollectionTarget::new(&cli.operator, &cli.ns, &cli.dest_dir)
        .with_context(|| format!("resolving destination {}", cli.dest_dir.display()))?;
    if let Err(e) = prepare_destination(&target).await {
        output::print_error(&e.to_string());
        return Err(e).context("preparing destination directory");
    }

    let log_path = target.destination_dir.join(layout::DEBUG_LOG_FILE);
    init_tracing(&log_path)?;

    let config = GatherConfig::load()?;
    info!(cli_binary = %config.cli_binary, "Configuration loaded");

    let cache = tempfile::Builder::new()
        .prefix("must-gather-kube-cache-")
        .tempdir()
        .context("creating kube cache directory")?;

    let client = CliClient::new(&config.cli_binary)
        .with_kubeconfig(cli.kubeconfig.clone())
        .with_env("KUBECACHEDIR", cache.path())
        .with_env("GATHER_LOGFILE_PATH", &log_path);

    output::print_info(&format!(
        "Gathering {} in {} into {}",
        target.operator_name,
        target.operator_namespace,
        target.destination_dir.display()
    ));

    let report = Orchestrator::new(&client, target, config).run().await;

    if let Err(e) = report.save().await {
        warn!(error = %e, "Could not save run summary");
        output::print_warning(&format!("Could not save run summary: {}", e));
    }

    output::print_banner(&report);
    output::print_tally(&report.tally);
    Ok(())
}
