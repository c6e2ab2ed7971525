//! Provider-reported stock lines, validated before they reach the sync core.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::price::{Price, PriceError};

/// Why a stock line was rejected at the door.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetailError {
    /// One of the three references is empty after trimming.
    #[error("empty {0}")]
    EmptyReference(&'static str),
    /// Quantities are counts of sellable units.
    #[error("negative available quantity {0} for {1}")]
    NegativeQuantity(i64, String),
    /// The quantity does not fit the catalog column.
    #[error("available quantity {0} out of range for {1}")]
    QuantityOutOfRange(i64, String),
    /// The reported price is not a valid price.
    #[error("invalid price for {reference}: {source}")]
    Price {
        /// Stock reference of the offending line.
        reference: String,
        /// Underlying price error.
        #[source]
        source: PriceError,
    },
}

/// One stock line of a provider feed, resolved against the catalog by its
/// three references.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawStockDetail")]
pub struct StockDetail {
    products_provider_reference: String,
    offers_provider_reference: String,
    stocks_provider_reference: String,
    available_quantity: i32,
    price: Option<Price>,
}

impl StockDetail {
    /// Builds a validated detail. `available_quantity` must be non-negative.
    pub fn new(
        products_provider_reference: impl Into<String>,
        offers_provider_reference: impl Into<String>,
        stocks_provider_reference: impl Into<String>,
        available_quantity: i64,
        price: Option<Price>,
    ) -> Result<Self, DetailError> {
        let product = non_empty(products_provider_reference.into(), "product reference")?;
        let offer = non_empty(offers_provider_reference.into(), "offer reference")?;
        let stock = non_empty(stocks_provider_reference.into(), "stock reference")?;

        if available_quantity < 0 {
            return Err(DetailError::NegativeQuantity(available_quantity, stock));
        }
        let available_quantity = i32::try_from(available_quantity)
            .map_err(|_| DetailError::QuantityOutOfRange(available_quantity, stock.clone()))?;

        Ok(Self {
            products_provider_reference: product,
            offers_provider_reference: offer,
            stocks_provider_reference: stock,
            available_quantity,
            price,
        })
    }

    /// Reference of the product this line is about.
    pub fn products_provider_reference(&self) -> &str {
        &self.products_provider_reference
    }

    /// Reference of the offer carrying the stock.
    pub fn offers_provider_reference(&self) -> &str {
        &self.offers_provider_reference
    }

    /// Reference of the stock itself.
    pub fn stocks_provider_reference(&self) -> &str {
        &self.stocks_provider_reference
    }

    /// Units the provider can sell, bookings excluded. Never negative.
    pub fn available_quantity(&self) -> i32 {
        self.available_quantity
    }

    /// Explicit provider price. A zero price counts as absent.
    pub fn price(&self) -> Option<Price> {
        self.price.filter(|p| !p.is_zero())
    }
}

fn non_empty(s: String, what: &'static str) -> Result<String, DetailError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(DetailError::EmptyReference(what));
    }
    Ok(trimmed.to_string())
}

/// Wire shape accepted from JSON files and connectors.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStockDetail {
    products_provider_reference: String,
    offers_provider_reference: String,
    stocks_provider_reference: String,
    available_quantity: i64,
    #[serde(default)]
    price: Option<serde_json::Value>,
}

impl TryFrom<RawStockDetail> for StockDetail {
    type Error = DetailError;

    fn try_from(raw: RawStockDetail) -> Result<Self, Self::Error> {
        let price = match raw.price {
            None | Some(serde_json::Value::Null) => None,
            Some(v) => {
                let text = match &v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let parsed = BigDecimal::from_str(text.trim())
                    .map_err(|_| PriceError::Unparseable(text.clone()))
                    .and_then(|d| Price::from_decimal(&d))
                    .map_err(|source| DetailError::Price {
                        reference: raw.stocks_provider_reference.clone(),
                        source,
                    })?;
                Some(parsed)
            }
        };
        StockDetail::new(
            raw.products_provider_reference,
            raw.offers_provider_reference,
            raw.stocks_provider_reference,
            raw.available_quantity,
            price,
        )
    }
}

/// The details of one synchronization run, unique by stock reference.
///
/// A provider should not report the same stock twice in a run; when it does,
/// the last line wins and the duplicate is logged.
#[derive(Debug, Clone, Default)]
pub struct StockBatch {
    details: Vec<StockDetail>,
}

impl StockBatch {
    /// Deduplicates `details` by stock reference, keeping the first position
    /// and the last value.
    pub fn new(details: impl IntoIterator<Item = StockDetail>) -> Self {
        let mut by_stock: IndexMap<String, StockDetail> = IndexMap::new();
        for detail in details {
            let key = detail.stocks_provider_reference().to_string();
            if let Some(previous) = by_stock.insert(key, detail) {
                warn!(
                    stock_ref = previous.stocks_provider_reference(),
                    "duplicate stock reference in batch, keeping the last line"
                );
            }
        }
        Self {
            details: by_stock.into_values().collect(),
        }
    }

    /// Keeps only the details accepted by `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&StockDetail) -> bool) {
        self.details.retain(keep);
    }

    /// Iterates over the details in feed order.
    pub fn iter(&self) -> std::slice::Iter<'_, StockDetail> {
        self.details.iter()
    }

    /// Number of details.
    pub fn len(&self) -> usize {
        self.details.len()
    }

    /// True when there is nothing to synchronize.
    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    /// Distinct product references, in feed order.
    pub fn product_references(&self) -> Vec<String> {
        distinct(self.details.iter().map(|d| d.products_provider_reference()))
    }

    /// Distinct offer references, in feed order.
    pub fn offer_references(&self) -> Vec<String> {
        distinct(self.details.iter().map(|d| d.offers_provider_reference()))
    }

    /// Distinct stock references, in feed order.
    pub fn stock_references(&self) -> Vec<String> {
        distinct(self.details.iter().map(|d| d.stocks_provider_reference()))
    }
}

impl<'a> IntoIterator for &'a StockBatch {
    type Item = &'a StockDetail;
    type IntoIter = std::slice::Iter<'a, StockDetail>;

    fn into_iter(self) -> Self::IntoIter {
        self.details.iter()
    }
}

fn distinct<'a>(refs: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = indexmap::IndexSet::new();
    for r in refs {
        seen.insert(r.to_string());
    }
    seen.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(stock: &str, qty: i64) -> StockDetail {
        StockDetail::new("isbn", "offer", stock, qty, None).unwrap()
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(
            StockDetail::new(" ", "o", "s", 1, None),
            Err(DetailError::EmptyReference("product reference"))
        );
        assert!(matches!(
            StockDetail::new("p", "o", "s", -2, None),
            Err(DetailError::NegativeQuantity(-2, _))
        ));
        assert!(matches!(
            StockDetail::new("p", "o", "s", i64::from(i32::MAX) + 1, None),
            Err(DetailError::QuantityOutOfRange(_, _))
        ));
        let widest = StockDetail::new("p", "o", "s", i64::from(i32::MAX), None).unwrap();
        assert_eq!(widest.available_quantity(), i32::MAX);
    }

    #[test]
    fn zero_price_counts_as_missing() {
        let d = StockDetail::new("p", "o", "s", 1, Some(Price::ZERO)).unwrap();
        assert_eq!(d.price(), None);
    }

    #[test]
    fn deserializes_optional_price() {
        let json = r#"[
            {"products_provider_reference": "9782070360024",
             "offers_provider_reference": "9782070360024@12345678900012",
             "stocks_provider_reference": "9782070360024@12345678900012",
             "available_quantity": 5, "price": 9.90},
            {"products_provider_reference": "9782070360031",
             "offers_provider_reference": "9782070360031@12345678900012",
             "stocks_provider_reference": "9782070360031@12345678900012",
             "available_quantity": 0, "price": null}
        ]"#;
        let details: Vec<StockDetail> = serde_json::from_str(json).unwrap();

        assert_eq!(details[0].price(), Some(Price::from_cents(990).unwrap()));
        assert_eq!(details[1].price(), None);
        assert_eq!(details[1].available_quantity(), 0);
    }

    #[test]
    fn deserialization_rejects_negative_quantity() {
        let json = r#"{"products_provider_reference": "p",
                       "offers_provider_reference": "o",
                       "stocks_provider_reference": "s",
                       "available_quantity": -1}"#;
        assert!(serde_json::from_str::<StockDetail>(json).is_err());
    }

    #[test]
    fn deserialization_rejects_absurd_price_exponents() {
        let json = r#"{"products_provider_reference": "p",
                       "offers_provider_reference": "o",
                       "stocks_provider_reference": "s",
                       "available_quantity": 1, "price": "1e400000000"}"#;
        let err = serde_json::from_str::<StockDetail>(json).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[test]
    fn batch_keeps_last_duplicate_in_first_position() {
        let batch = StockBatch::new([detail("a", 1), detail("b", 2), detail("a", 3)]);

        let got: Vec<(&str, i32)> = batch
            .iter()
            .map(|d| (d.stocks_provider_reference(), d.available_quantity()))
            .collect();
        assert_eq!(got, vec![("a", 3), ("b", 2)]);
        assert_eq!(batch.offer_references(), vec!["offer".to_string()]);
    }
}
