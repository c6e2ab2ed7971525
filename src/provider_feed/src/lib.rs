//! Client side of the provider stock APIs.
//!
//! Providers (book distributors, cinema chains, ...) expose the stock lines of
//! one point of sale as a paged JSON feed. This crate fetches those pages and
//! hands back raw, unvalidated [`models::RawStock`] records; turning them into
//! catalog mutations is the job of the `stock_sync` crate.

pub mod errors;
pub mod models;
pub mod providers;

pub use errors::FeedError;
pub use models::{RawStock, StockPage, StockPageRequest};
pub use providers::{StockProvider, http::ProviderApi};
