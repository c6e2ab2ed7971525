//! Provider stock synchronization for a cultural booking marketplace.
//!
//! Third-party providers (book distributors, cinema chains) report the stock
//! of each point of sale. [`sync::synchronize_stocks`] merges one batch of
//! those reports into the catalog's offers and stocks, and
//! [`venue_provider::synchronize_venue_provider`] drives it page by page from a
//! provider's stock API.

#![deny(missing_docs)]

pub mod catalog;
pub mod config;
pub mod db;
pub mod detail;
pub mod feed;
pub mod models;
pub mod price;
/// Diesel table definitions matching the embedded migrations.
#[allow(missing_docs)]
pub mod schema;
pub mod sync;
pub mod timestamp;
pub mod validation;
pub mod venue_provider;
