//! Provider abstraction for stock feeds.
//!
//! [`StockProvider`] is the unified interface over every provider that exposes
//! its inventory through the paged stock API. The trait is async and object
//! safe, so a runtime can pick a concrete provider from configuration and keep
//! it as `Box<dyn StockProvider + Send + Sync>`.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use provider_feed::{FeedError, StockPage, StockPageRequest, StockProvider};
//!
//! struct EmptyProvider;
//!
//! #[async_trait]
//! impl StockProvider for EmptyProvider {
//!     async fn fetch_stocks(&self, _req: &StockPageRequest) -> Result<StockPage, FeedError> {
//!         Ok(StockPage { total: Some(0), limit: None, offset: None, stocks: vec![] })
//!     }
//! }
//! ```

pub mod http;

use async_trait::async_trait;

use crate::{
    errors::FeedError,
    models::{StockPage, StockPageRequest},
};

/// Source of stock pages for one provider.
#[async_trait]
pub trait StockProvider {
    /// Fetch a single page of stocks.
    async fn fetch_stocks(&self, request: &StockPageRequest) -> Result<StockPage, FeedError>;
}
