use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use batchscreen::client::WatchClient;
use batchscreen::config::{ScreenConfig, DEFAULT_API_ADDRESS};
use batchscreen::dispatch;

#[derive(Parser)]
#[command(name = "batchscreen")]
#[command(about = "Bulk sanctions-list screening", long_about = None)]
struct Cli {
    /// CSV file with subjects to screen (header + one subject per row)
    #[arg(short, long)]
    file: PathBuf,

    /// Search service address
    #[arg(long, default_value = DEFAULT_API_ADDRESS)]
    address: String,

    /// Minimum match percentage required for blocking
    #[arg(long, default_value_t = 0.99)]
    threshold: f64,

    /// How close must names match for the service to return a candidate
    #[arg(long = "min-match", default_value_t = 0.90)]
    min_match: f64,

    /// sdnType query param
    #[arg(long = "sdn-type", default_value = "individual")]
    sdn_type: String,

    /// Override what is set for the X-Request-ID HTTP header
    #[arg(long = "request-id")]
    request_id: Option<String>,

    /// How many searches to run concurrently (defaults to host parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Separator for columns in the output file
    #[arg(long, default_value = ",")]
    separator: String,

    /// Write results to <file>_output.csv instead of stdout
    #[arg(long)]
    write: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let defaults = ScreenConfig::default();
    let config = ScreenConfig {
        address: cli.address,
        workers: cli.workers.unwrap_or(defaults.workers),
        threshold: cli.threshold,
        min_match: cli.min_match,
        sdn_type: cli.sdn_type,
        request_id: cli.request_id,
        separator: cli.separator,
        ..defaults
    };
    info!(address = %config.address, "using search service");

    let client = Arc::new(WatchClient::new(&config).context("building HTTP client")?);
    client
        .ping()
        .await
        .with_context(|| format!("ping sanctions search at {}", config.address))?;
    info!("ping ok");

    let input = tokio::fs::read_to_string(&cli.file)
        .await
        .with_context(|| format!("problem reading {}", cli.file.display()))?;

    let report = dispatch::run_batch(&input, client, &config).await?;
    if report.failed > 0 {
        warn!(
            succeeded = report.succeeded,
            failed = report.failed,
            "batch finished with failures"
        );
    }

    if cli.write {
        let path = output_path(&cli.file);
        tokio::fs::write(&path, report.to_csv())
            .await
            .with_context(|| format!("problem writing {}", path.display()))?;
        info!(path = %path.display(), "results written");
    } else {
        println!("{}", report.to_csv());
    }

    Ok(())
}

/// `names.csv` becomes `names_output.csv`, next to the input file.
fn output_path(input: &std::path::Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("batch");
    input.with_file_name(format!("{}_output.csv", stem))
}
