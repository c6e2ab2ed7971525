//! Wire models of the provider stock feed.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer};

/// One stock line as reported by a provider.
///
/// Nothing is validated here: `available` may be missing and `price` may be in
/// euros or in cents depending on the provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawStock {
    /// Provider product reference (an EAN for books).
    #[serde(rename = "ref")]
    pub reference: String,
    /// Units the provider can sell right now.
    #[serde(default)]
    pub available: Option<i64>,
    /// Unit price, when the provider reports one.
    #[serde(default, deserialize_with = "de_decimal_opt")]
    pub price: Option<BigDecimal>,
}

/// One page of the feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StockPage {
    /// Total number of stock lines the provider knows about.
    #[serde(default)]
    pub total: Option<u64>,
    /// Page size echoed back by the provider.
    #[serde(default)]
    pub limit: Option<u64>,
    /// Offset of this page.
    #[serde(default)]
    pub offset: Option<u64>,
    /// Stock lines of this page. An empty list ends the pagination.
    #[serde(default)]
    pub stocks: Vec<RawStock>,
}

impl StockPage {
    /// Reference of the last stock line, used as the `after` cursor.
    pub fn last_reference(&self) -> Option<&str> {
        self.stocks.last().map(|s| s.reference.as_str())
    }
}

/// Parameters of one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockPageRequest {
    /// Venue identifier at the provider (SIRET by default).
    pub siret: String,
    /// Page size.
    pub limit: u32,
    /// Cursor: only stocks after this reference.
    pub after: Option<String>,
    /// Only stocks modified since this instant.
    pub modified_since: Option<DateTime<Utc>>,
}

impl StockPageRequest {
    /// First page request for a venue.
    pub fn first(siret: impl Into<String>, limit: u32, modified_since: Option<DateTime<Utc>>) -> Self {
        Self {
            siret: siret.into(),
            limit,
            after: None,
            modified_since,
        }
    }

    /// Request for the page following `page`, or `None` when `page` was the last one.
    pub fn next_after(&self, page: &StockPage) -> Option<Self> {
        let last = page.last_reference()?;
        Some(Self {
            after: Some(last.to_string()),
            ..self.clone()
        })
    }

    /// Query string pairs, in the order the provider documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut q = vec![("limit", self.limit.to_string())];
        if let Some(after) = &self.after {
            q.push(("after", after.clone()));
        }
        if let Some(since) = self.modified_since {
            q.push((
                "modifiedSince",
                since.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }
        q
    }
}

// Prices arrive as JSON numbers. Going through the number's textual form keeps
// `28.989` exact instead of widening it to the nearest f64.
fn de_decimal_opt<'de, D>(deserializer: D) -> Result<Option<BigDecimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => BigDecimal::from_str(&n.to_string())
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(serde_json::Value::String(s)) => BigDecimal::from_str(s.trim())
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a number for price, got {other}"
        ))),
    }
}
