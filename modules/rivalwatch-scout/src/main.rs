use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rivalwatch_common::Config;
use rivalwatch_scout::aggregate::Aggregator;
use rivalwatch_scout::browser::HeadlessBrowser;
use rivalwatch_scout::evidence::EvidenceStore;
use rivalwatch_scout::persist::DatasetWriter;
use rivalwatch_scout::sources;

#[derive(Parser)]
#[command(name = "rivalwatch-scout", about = "Scrape competitor promotion and product data")]
struct Cli {
    /// Scrape only these source ids (default: all configured sources).
    #[arg(long = "source")]
    sources: Vec<String>,

    /// Override the data directory for the run output document.
    #[arg(long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("RivalWatch scout starting...");

    let cli = Cli::parse();
    let config = Config::from_env();

    let profiles: Vec<_> = if cli.sources.is_empty() {
        sources::profiles()
    } else {
        cli.sources
            .iter()
            .filter_map(|id| {
                let found = sources::profile(id);
                if found.is_none() {
                    warn!(source = id.as_str(), "Unknown source id, skipping");
                }
                found
            })
            .collect()
    };
    if profiles.is_empty() {
        anyhow::bail!("No configured sources selected");
    }

    let browser = HeadlessBrowser::new(&config);
    let store = EvidenceStore::new(&config.screenshot_dir);
    let aggregator = Aggregator::new(&browser, &store, &config);

    let (dataset, stats) = aggregator.run(&profiles).await;

    let data_dir = cli.data_dir.unwrap_or_else(|| config.data_dir.clone());
    let path = DatasetWriter::new(data_dir).write(&dataset)?;
    info!(path = %path.display(), "Scrape run saved");
    info!("{stats}");

    Ok(())
}
