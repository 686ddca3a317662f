use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use starpath_adapters::{ClientConfig, SpacexClient};
use starpath_core::{Clock, EntityType, SystemClock};
use starpath_pipeline::{Pipeline, PipelineConfig};
use starpath_store::RawRecordStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "starpath")]
#[command(about = "Starlink constellation ETL and projection pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch satellite and launch payloads from the SpaceX API into the
    /// raw store.
    Extract,
    /// Normalize the raw store, aggregate, analyze, and write projection
    /// reports for one run.
    Run,
    /// Print per-entity raw record counts and extraction recency.
    Report,
}

fn client_config_from_env() -> ClientConfig {
    let mut config = ClientConfig::default();
    if let Ok(base_url) = std::env::var("SPACEX_API_URL") {
        config.base_url = base_url;
    }
    if let Ok(user_agent) = std::env::var("STARPATH_USER_AGENT") {
        config.user_agent = user_agent;
    }
    if let Ok(secs) = std::env::var("STARPATH_HTTP_TIMEOUT_SECS") {
        if let Ok(secs) = secs.parse::<u64>() {
            config.timeout = Duration::from_secs(secs);
        }
    }
    config
}

async fn extract(store: &RawRecordStore, clock: &dyn Clock) -> Result<()> {
    let client = SpacexClient::new(client_config_from_env())?;
    for entity in EntityType::ALL {
        let batch = client
            .fetch_entity(entity, clock.now())
            .await
            .with_context(|| format!("fetching {}", entity.as_str()))?;
        let summary = store
            .upsert_all(entity, &batch.records)
            .await
            .with_context(|| format!("storing {}", entity.as_str()))?;
        info!(
            entity = entity.as_str(),
            inserted = summary.inserted,
            updated = summary.updated,
            rejected = batch.rejected,
            "extraction stored"
        );
        println!(
            "{}: {} inserted, {} updated, {} rejected",
            entity.as_str(),
            summary.inserted,
            summary.updated,
            batch.rejected
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let clock = Arc::new(SystemClock);
    let config = PipelineConfig::from_env()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Extract => {
            let store = RawRecordStore::new(config.store_dir.clone());
            extract(&store, clock.as_ref()).await?;
        }
        Commands::Run => {
            let pipeline = Pipeline::new(config, clock);
            let summary = pipeline.run_once().await?;
            println!(
                "run complete: run_id={} satellites={} launches={} active={} reports={}",
                summary.run_id,
                summary.satellites_normalized,
                summary.launches_normalized,
                summary.snapshot.active_satellites,
                summary.reports_dir
            );
            for projection in &summary.projections {
                println!(
                    "  {}: launches={} months={} completion={}",
                    projection.scenario.as_str(),
                    opt(&projection.launches_needed),
                    opt(&projection.months_needed.map(|m| (m * 10.0).round() / 10.0)),
                    opt(&projection.completion_date),
                );
            }
        }
        Commands::Report => {
            let store = RawRecordStore::new(config.store_dir.clone());
            let counts = store.counts().await?;
            for (entity, entry) in counts {
                println!(
                    "{}: {} records, last extracted {}",
                    entity,
                    entry.records,
                    entry
                        .last_extracted_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string())
                );
            }
        }
    }

    Ok(())
}

fn opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "undetermined".to_string())
}
