//! Storefront assistant core: configuration, error taxonomy, shop domain types,
//! the catalog seam and the mention enhancer.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod enhance;
pub mod errors;

pub use catalog::{CatalogError, CatalogSource, OrderSource};
pub use domain::chat::{ChatRecord, ChatRole};
pub use domain::order::{Order, OrderCustomer, OrderId, OrderLineItem};
pub use domain::product::{Product, ProductHandle, NOT_AVAILABLE};
pub use enhance::{EnhanceOutcome, Enhancement, Enhancer};
pub use errors::{ApplicationError, InterfaceError};
