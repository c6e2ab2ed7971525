//! Diesel models mapping to the database schema.
//!
//! These types mirror the tables defined in the embedded migrations and in
//! [`crate::schema`]:
//! - [`crate::schema::venue`], [`crate::schema::provider`],
//!   [`crate::schema::venue_provider`]: who sells and who feeds the stock
//! - [`crate::schema::product`]: canonical catalog entries offers derive from
//! - [`crate::schema::offer`], [`crate::schema::stock`]: what the sync creates and updates
//! - [`crate::schema::booking`]: units already reserved on a stock
//! - [`crate::schema::offer_index_queue`]: offers waiting for reindexing

use diesel::prelude::*;

use crate::schema::*;

/// A point of sale; owner of offers.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = venue, check_for_backend(diesel::sqlite::Sqlite))]
pub struct Venue {
    /// Primary key.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Company registration number; default venue identifier at providers.
    pub siret: Option<String>,
    /// Address notified of bookings, copied onto created offers.
    pub booking_email: Option<String>,
    /// Pickup instructions, copied onto created offers.
    pub withdrawal_details: Option<String>,
}

/// Insertable form of [`Venue`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = venue)]
pub struct NewVenue<'a> {
    /// Display name.
    pub name: &'a str,
    /// Company registration number.
    pub siret: Option<&'a str>,
    /// Booking notification address.
    pub booking_email: Option<&'a str>,
    /// Pickup instructions.
    pub withdrawal_details: Option<&'a str>,
}

/// An external system supplying inventory.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = provider, check_for_backend(diesel::sqlite::Sqlite))]
pub struct Provider {
    /// Primary key.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Root of the provider stock API, when the provider has one.
    pub api_url: Option<String>,
    /// Token sent as `Authorization: Basic <token>`.
    pub auth_token: Option<String>,
    /// Whether the API reports prices in cents.
    pub prices_in_cents: bool,
    /// Inactive providers are never synchronized.
    pub is_active: bool,
}

/// Insertable form of [`Provider`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = provider)]
pub struct NewProvider<'a> {
    /// Display name.
    pub name: &'a str,
    /// API root.
    pub api_url: Option<&'a str>,
    /// API token.
    pub auth_token: Option<&'a str>,
    /// Prices in cents.
    pub prices_in_cents: bool,
    /// Active flag.
    pub is_active: bool,
}

/// Link between a venue and the provider feeding its stocks.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = venue_provider, check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(belongs_to(Venue, foreign_key = venue_id))]
#[diesel(belongs_to(Provider, foreign_key = provider_id))]
pub struct VenueProvider {
    /// Primary key.
    pub id: i32,
    /// FK to [`Venue::id`].
    pub venue_id: i32,
    /// FK to [`Provider::id`].
    pub provider_id: i32,
    /// Venue identifier at the provider; the venue SIRET when unset.
    pub venue_id_at_offer_provider: Option<String>,
    /// Inactive links are skipped.
    pub is_active: bool,
    /// Start of the last successful run (RFC3339 UTC).
    pub last_sync_date: Option<String>,
}

/// Insertable form of [`VenueProvider`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = venue_provider)]
pub struct NewVenueProvider<'a> {
    /// FK to [`Venue::id`].
    pub venue_id: i32,
    /// FK to [`Provider::id`].
    pub provider_id: i32,
    /// Venue identifier at the provider.
    pub venue_id_at_offer_provider: Option<&'a str>,
    /// Active flag.
    pub is_active: bool,
}

/// A catalog product, resolvable by its provider reference.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable)]
#[diesel(table_name = product, check_for_backend(diesel::sqlite::Sqlite))]
pub struct Product {
    /// Primary key.
    pub id: i32,
    /// Title.
    pub name: String,
    /// Long description.
    pub description: Option<String>,
    /// JSON metadata; carries the catalog price under `"prix_livre"`.
    pub extra_data: Option<String>,
    /// Category code.
    pub subcategory_id: String,
    /// External reference (an EAN for books).
    pub id_at_providers: Option<String>,
    /// Products flagged incompatible with the terms of use never get offers.
    pub gcu_compatible: bool,
}

/// Insertable form of [`Product`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = product)]
pub struct NewProduct<'a> {
    /// Title.
    pub name: &'a str,
    /// Long description.
    pub description: Option<&'a str>,
    /// JSON metadata.
    pub extra_data: Option<&'a str>,
    /// Category code.
    pub subcategory_id: &'a str,
    /// External reference.
    pub id_at_providers: Option<&'a str>,
    /// Terms-of-use compatibility.
    pub gcu_compatible: bool,
}

/// An offer row as read back by tests and tooling.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable)]
#[diesel(table_name = offer, check_for_backend(diesel::sqlite::Sqlite))]
pub struct Offer {
    /// Primary key.
    pub id: i32,
    /// FK to [`Venue::id`].
    pub venue_id: i32,
    /// FK to [`Product::id`].
    pub product_id: i32,
    /// Title copied from the product.
    pub name: String,
    /// Description copied from the product.
    pub description: Option<String>,
    /// Metadata copied from the product.
    pub extra_data: Option<String>,
    /// Category copied from the product.
    pub subcategory_id: String,
    /// Copied from the venue.
    pub booking_email: Option<String>,
    /// Copied from the venue.
    pub withdrawal_details: Option<String>,
    /// Offer reference at the provider; unique.
    pub id_at_providers: Option<String>,
    /// Product reference at the provider.
    pub id_at_provider: Option<String>,
    /// Provider of the last synchronization touching this offer.
    pub last_provider_id: Option<i32>,
    /// Row modification timestamp (RFC3339 UTC).
    pub date_modified: String,
}

/// An offer built by the sync, ready for bulk insert.
#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = offer)]
pub struct NewOffer {
    /// Owning venue.
    pub venue_id: i32,
    /// Source product.
    pub product_id: i32,
    /// Copied from the product.
    pub name: String,
    /// Copied from the product.
    pub description: Option<String>,
    /// Copied from the product.
    pub extra_data: Option<String>,
    /// Copied from the product.
    pub subcategory_id: String,
    /// Copied from the venue.
    pub booking_email: Option<String>,
    /// Copied from the venue.
    pub withdrawal_details: Option<String>,
    /// Offer reference at the provider.
    pub id_at_providers: String,
    /// Product reference at the provider.
    pub id_at_provider: String,
    /// Provider running the sync.
    pub last_provider_id: Option<i32>,
    /// Creation timestamp (RFC3339 UTC).
    pub date_modified: String,
}

/// A stock row as read back by tests and tooling.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = stock, check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(belongs_to(Offer, foreign_key = offer_id))]
pub struct Stock {
    /// Primary key.
    pub id: i32,
    /// FK to [`Offer::id`].
    pub offer_id: i32,
    /// Total saleable units, bookings included. NULL means unlimited.
    pub quantity: Option<i32>,
    /// Last quantity reported by the provider, bookings excluded.
    pub raw_provider_quantity: Option<i32>,
    /// Unit price in cents.
    pub price_cents: i64,
    /// Booking deadline; provider stocks have none.
    pub booking_limit_datetime: Option<String>,
    /// Stock reference at the provider; unique.
    pub id_at_providers: Option<String>,
    /// Provider of the last synchronization touching this stock.
    pub last_provider_id: Option<i32>,
    /// Row modification timestamp (RFC3339 UTC).
    pub date_modified: String,
}

/// A stock built by the sync, ready for bulk insert.
#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = stock)]
pub struct NewStock {
    /// Owning offer.
    pub offer_id: i32,
    /// Equals `raw_provider_quantity` at creation.
    pub quantity: Option<i32>,
    /// Units reported by the provider.
    pub raw_provider_quantity: Option<i32>,
    /// Resolved price in cents.
    pub price_cents: i64,
    /// Always `None` for provider stocks.
    pub booking_limit_datetime: Option<String>,
    /// Stock reference at the provider.
    pub id_at_providers: String,
    /// Provider running the sync.
    pub last_provider_id: Option<i32>,
    /// Creation timestamp (RFC3339 UTC).
    pub date_modified: String,
}

/// Changes applied to an existing stock. `last_provider_id` is written even
/// when `None` so a run without provider clears the previous one.
#[derive(Debug, Clone, PartialEq, Eq, AsChangeset)]
#[diesel(table_name = stock, treat_none_as_null = true)]
pub struct StockUpdate {
    /// Provider quantity plus booked units.
    pub quantity: Option<i32>,
    /// Units reported by the provider.
    pub raw_provider_quantity: Option<i32>,
    /// Resolved price in cents.
    pub price_cents: i64,
    /// Provider running the sync.
    pub last_provider_id: Option<i32>,
    /// Update timestamp (RFC3339 UTC).
    pub date_modified: String,
}

/// A booking on a stock.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = booking)]
pub struct NewBooking {
    /// FK to [`Stock::id`].
    pub stock_id: i32,
    /// Reserved units.
    pub quantity: i32,
    /// Cancelled bookings do not hold units.
    pub is_cancelled: bool,
}

/// An offer waiting in the reindex queue.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = offer_index_queue, check_for_backend(diesel::sqlite::Sqlite))]
pub struct QueuedOffer {
    /// Offer to reindex.
    pub offer_id: i32,
    /// Last time the offer was enqueued (RFC3339 UTC).
    pub enqueued_at: String,
}
