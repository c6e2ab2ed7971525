use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stock_sync::{
    catalog::SqliteCatalog,
    config::{SyncConfig, load_config_path},
    db::{connection::connect_sqlite, migrate},
    detail::StockDetail,
    models::Venue,
    schema::venue,
    sync::{
        SyncOptions, SyncSummary,
        reindex::{Indexer, LogIndexer, QueueIndexer},
        synchronize_stocks,
    },
    venue_provider::{VenueProviderTarget, synchronize_venue_provider},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Provider stock synchronization")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Apply pending schema migrations.
    Migrate,
    /// Synchronize a JSON array of stock details for a venue.
    SyncFile {
        #[arg(long)]
        venue: i32,
        #[arg(long)]
        provider: Option<i32>,
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },
    /// Pull a venue's stocks from its provider API and synchronize them.
    SyncVenueProvider {
        #[arg(long)]
        id: i32,
    },
}

fn indexer(config: &SyncConfig) -> Result<Box<dyn Indexer>> {
    if config.enqueue_reindex {
        Ok(Box::new(QueueIndexer::connect(&config.database_url)?))
    } else {
        Ok(Box::new(LogIndexer))
    }
}

fn print_summary(summary: &SyncSummary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config_path(path)?,
        None => SyncConfig::default(),
    }
    .with_env_overrides();
    let repo = SqliteCatalog::new(config.resolve_chunk_size);

    match cli.cmd {
        Cmd::Migrate => {
            migrate::run_sqlite(&config.database_url)?;
        }
        Cmd::SyncFile {
            venue: venue_id,
            provider,
            file,
            dry_run,
        } => {
            use diesel::prelude::*;

            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let details: Vec<StockDetail> = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", file.display()))?;

            let mut conn = connect_sqlite(&config.database_url)?;
            let venue: Venue = venue::table
                .find(venue_id)
                .select(Venue::as_select())
                .first(&mut conn)
                .with_context(|| format!("loading venue {venue_id}"))?;

            let opt = SyncOptions {
                dry_run,
                validation: config.validation.clone(),
            };
            let mut indexer = indexer(&config)?;
            let summary = synchronize_stocks(
                &mut conn,
                &repo,
                details,
                &venue,
                provider,
                indexer.as_mut(),
                &opt,
            )?;
            print_summary(&summary)?;
        }
        Cmd::SyncVenueProvider { id } => {
            let mut conn = connect_sqlite(&config.database_url)?;
            let target = VenueProviderTarget::load(&mut conn, id)?;
            let api = target.api()?;
            let mut indexer = indexer(&config)?;
            let summary = synchronize_venue_provider(
                &mut conn,
                &repo,
                &api,
                &target,
                indexer.as_mut(),
                &config,
            )
            .await?;
            print_summary(&summary)?;
        }
    }

    Ok(())
}
