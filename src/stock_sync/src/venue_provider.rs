//! Paged synchronization of a venue from its provider's stock API.
//!
//! Pages are requested with `modifiedSince = last_sync_date` and an `after`
//! cursor, and every non-empty page is synchronized as its own batch (one
//! transaction and one reindex signal per page). Once the feed is exhausted the
//! run start time becomes the new `last_sync_date`, so a failed run is replayed
//! from the same point next time.

use anyhow::{Context, anyhow, bail};
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use provider_feed::{ProviderApi, StockPageRequest, StockProvider};
use secrecy::SecretString;
use tracing::{info, warn};

use crate::{
    catalog::CatalogRepo,
    config::SyncConfig,
    feed::build_stock_details,
    models::{Provider, Venue, VenueProvider},
    schema::{provider, venue, venue_provider},
    sync::{SyncOptions, SyncSummary, reindex::Indexer, synchronize_stocks},
    timestamp,
};

/// A venue provider link with its venue and provider rows.
#[derive(Debug, Clone)]
pub struct VenueProviderTarget {
    /// The link itself.
    pub link: VenueProvider,
    /// Venue receiving the stocks.
    pub venue: Venue,
    /// Provider supplying them.
    pub provider: Provider,
}

impl VenueProviderTarget {
    /// Loads the link `venue_provider_id` and its venue and provider.
    pub fn load(conn: &mut SqliteConnection, venue_provider_id: i32) -> anyhow::Result<Self> {
        let link: VenueProvider = venue_provider::table
            .find(venue_provider_id)
            .select(VenueProvider::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| anyhow!("venue provider {venue_provider_id} not found"))?;
        let venue: Venue = venue::table
            .find(link.venue_id)
            .select(Venue::as_select())
            .first(conn)?;
        let provider: Provider = provider::table
            .find(link.provider_id)
            .select(Provider::as_select())
            .first(conn)?;
        Ok(Self { link, venue, provider })
    }

    /// Venue identifier sent to the provider: the link's own, else the venue SIRET.
    pub fn siret(&self) -> anyhow::Result<String> {
        self.link
            .venue_id_at_offer_provider
            .clone()
            .or_else(|| self.venue.siret.clone())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("venue {} has no identifier at its provider", self.venue.id))
    }

    /// HTTP client for the provider's stock API.
    pub fn api(&self) -> anyhow::Result<ProviderApi> {
        let url = self
            .provider
            .api_url
            .as_deref()
            .ok_or_else(|| anyhow!("provider {} has no api_url", self.provider.id))?;
        let token = SecretString::from(self.provider.auth_token.clone().unwrap_or_default());
        Ok(ProviderApi::new(url, token)?)
    }
}

/// Pull every changed stock of a venue from `feed` and synchronize it.
///
/// Inactive links or providers are skipped and yield an empty summary.
pub async fn synchronize_venue_provider<R, P>(
    conn: &mut SqliteConnection,
    repo: &R,
    feed: &P,
    target: &VenueProviderTarget,
    indexer: &mut dyn Indexer,
    config: &SyncConfig,
) -> anyhow::Result<SyncSummary>
where
    R: CatalogRepo + ?Sized,
    P: StockProvider + ?Sized,
{
    if !target.link.is_active || !target.provider.is_active {
        warn!(
            venue_provider_id = target.link.id,
            provider_id = target.provider.id,
            "inactive venue provider, skipping"
        );
        return Ok(SyncSummary::default());
    }
    if config.page_size == 0 {
        bail!("page_size must be > 0");
    }

    let started = Utc::now();
    let since = target
        .link
        .last_sync_date
        .as_deref()
        .map(timestamp::parse)
        .transpose()
        .context("stored last_sync_date")?;
    let siret = target.siret()?;
    let opt = SyncOptions {
        dry_run: false,
        validation: config.validation.clone(),
    };

    info!(
        venue_provider_id = target.link.id,
        %siret,
        since = ?since,
        "synchronizing venue provider"
    );

    let mut total = SyncSummary::default();
    let mut pages = 0usize;
    let mut request = Some(StockPageRequest::first(siret.clone(), config.page_size, since));
    while let Some(req) = request {
        let page = feed
            .fetch_stocks(&req)
            .await
            .with_context(|| format!("fetching stocks after {:?}", req.after))?;
        if page.stocks.is_empty() {
            break;
        }
        pages += 1;

        let details = build_stock_details(&page.stocks, &siret, target.provider.prices_in_cents);
        total += synchronize_stocks(
            conn,
            repo,
            details,
            &target.venue,
            Some(target.provider.id),
            indexer,
            &opt,
        )?;
        request = req.next_after(&page);
    }

    diesel::update(venue_provider::table.find(target.link.id))
        .set(venue_provider::last_sync_date.eq(timestamp::format(started)))
        .execute(conn)?;

    info!(venue_provider_id = target.link.id, pages, %total, "venue provider synchronized");
    Ok(total)
}
