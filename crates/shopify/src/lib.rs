//! Shopify Admin REST adapter.
//!
//! Implements the core [`CatalogSource`](storefront_core::CatalogSource) and
//! [`OrderSource`](storefront_core::OrderSource) seams over the Admin API.
//! Responses are decoded into the explicit wire structs in [`wire`] and then
//! converted into domain types with defaults filled in.

pub mod client;
pub mod wire;

pub use client::{AdminClient, ClientError, ACCESS_TOKEN_HEADER};
