//! Raw provider stocks to [`StockDetail`]s.

use indexmap::IndexMap;
use provider_feed::RawStock;
use tracing::{debug, warn};

use crate::{detail::StockDetail, price::Price};

/// Offer and stock reference of a product at a venue: `{reference}@{siret}`.
pub fn venue_reference(reference: &str, siret: &str) -> String {
    format!("{reference}@{siret}")
}

/// Converts one page of raw stocks for the venue identified by `siret`.
///
/// - lines without `available` are skipped;
/// - a reference repeated in the page keeps its last line;
/// - with `prices_in_cents`, `1234` means `12.34`.
///
/// Lines that do not make a valid detail are logged and skipped.
pub fn build_stock_details(raw_stocks: &[RawStock], siret: &str, prices_in_cents: bool) -> Vec<StockDetail> {
    let mut by_ref: IndexMap<&str, &RawStock> = IndexMap::new();
    for raw in raw_stocks {
        if raw.available.is_none() {
            debug!(product_ref = %raw.reference, "stock line without quantity, skipping");
            continue;
        }
        by_ref.insert(raw.reference.as_str(), raw);
    }

    by_ref
        .into_values()
        .filter_map(|raw| match to_detail(raw, siret, prices_in_cents) {
            Ok(detail) => Some(detail),
            Err(e) => {
                warn!(product_ref = %raw.reference, error = %e, "invalid stock line, skipping");
                None
            }
        })
        .collect()
}

fn to_detail(raw: &RawStock, siret: &str, prices_in_cents: bool) -> anyhow::Result<StockDetail> {
    let price = raw
        .price
        .as_ref()
        .map(|p| {
            if prices_in_cents {
                Price::from_decimal_cents(p)
            } else {
                Price::from_decimal(p)
            }
        })
        .transpose()?;
    let reference = venue_reference(&raw.reference, siret);
    Ok(StockDetail::new(
        raw.reference.as_str(),
        reference.clone(),
        reference,
        raw.available.unwrap_or(0),
        price,
    )?)
}
