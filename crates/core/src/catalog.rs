//! Seams between the assistant and the commerce backend.
//!
//! The enhancer and the agent tools only see these traits; the HTTP client in
//! `storefront-shopify` is one implementation, tests supply in-memory ones.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::order::{Order, OrderId};
use crate::domain::product::Product;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("commerce backend unavailable: {0}")]
    Unavailable(String),
    #[error("commerce backend returned a malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Lists the default page of products; no filter, no pagination traversal.
    async fn fetch_catalog(&self) -> Result<Vec<Product>, CatalogError>;
}

#[async_trait]
pub trait OrderSource: Send + Sync {
    async fn list_orders(&self) -> Result<Vec<Order>, CatalogError>;
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, CatalogError>;
}
