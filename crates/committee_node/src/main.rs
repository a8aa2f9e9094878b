use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use committee_config::{load, CommitteeConfig, ConfigOverrides};
use committee_gateway::AvailabilityGatewayClient;
use committee_node::{AlwaysValid, Committer, StartupError};
use committee_patricia::PedersenHasher;
use committee_signer::Secp256k1Signer;
use committee_storage::{BucketedStorage, FactCache, MapStorage, Storage};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[command(about = "Data-availability committee batch validator")]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used for any field it omits.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

fn build_storage(config: &CommitteeConfig) -> Arc<dyn Storage> {
    let backing = BucketedStorage::with_default_bits(MapStorage::new());
    Arc::new(FactCache::new(backing, config.fact_storage_cache_size))
}

fn init_tracing(config: &CommitteeConfig) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load(cli.config.as_deref(), &cli.overrides)?;
    init_tracing(&config);

    tracing::info!(endpoint = %config.availability_gateway_endpoint, "starting committee");

    let store = build_storage(&config);
    let hasher = Arc::new(PedersenHasher);
    let gateway_url = Url::parse(&config.availability_gateway_endpoint).map_err(StartupError::InvalidUrl)?;
    let gateway = Arc::new(AvailabilityGatewayClient::new(
        gateway_url,
        Duration::from_secs(config.http_request_timeout),
        config.certificates_path.as_deref(),
    )?);
    let signer = Arc::new(Secp256k1Signer::from_file(&config.private_key_path)?);

    let committer = Committer::new(
        store,
        hasher,
        gateway,
        signer,
        Arc::new(AlwaysValid),
        config.committee_objects.clone(),
        config.validate_orders,
        config.validate_rollup,
        Duration::from_secs_f64(config.polling_interval),
    );

    committer.bootstrap().await?;

    let committer = Arc::new(committer);
    let shutdown_committer = Arc::clone(&committer);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received shutdown signal");
            shutdown_committer.stop();
        }
    });

    committer.run().await;
    tracing::info!("committee stopped");
    Ok(())
}
