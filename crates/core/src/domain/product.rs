use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder shown wherever a product or order field is absent.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductHandle(pub String);

impl fmt::Display for ProductHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A product as listed by the commerce backend.
///
/// Prices stay as the backend's decimal strings; nothing in the assistant does
/// arithmetic on them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub title: String,
    pub handle: ProductHandle,
    pub description: Option<String>,
    pub variant_prices: Vec<String>,
    pub image_urls: Vec<String>,
}

impl Product {
    pub fn primary_image(&self) -> Option<&str> {
        self.image_urls.first().map(String::as_str)
    }

    pub fn first_price(&self) -> &str {
        self.variant_prices.first().map(String::as_str).unwrap_or(NOT_AVAILABLE)
    }

    pub fn description_or_default(&self) -> &str {
        self.description
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(NOT_AVAILABLE)
    }

    /// Storefront URL for this product under `shop_base_url` (scheme + host).
    pub fn url(&self, shop_base_url: &str) -> String {
        format!("{}/products/{}", shop_base_url.trim_end_matches('/'), self.handle)
    }
}
