//! Admin API response shapes.
//!
//! Every field the assistant does not strictly need is optional so a sparse or
//! partially populated record still decodes; the `From` conversions supply
//! the defaults (`N/A`, empty lists).

use serde::Deserialize;
use storefront_core::{
    Order, OrderCustomer, OrderId, OrderLineItem, Product, ProductHandle, NOT_AVAILABLE,
};

#[derive(Debug, Deserialize)]
pub struct ProductsEnvelope {
    #[serde(default)]
    pub products: Option<Vec<WireProduct>>,
}

#[derive(Debug, Deserialize)]
pub struct OrdersEnvelope {
    #[serde(default)]
    pub orders: Option<Vec<WireOrder>>,
}

#[derive(Debug, Deserialize)]
pub struct OrderEnvelope {
    pub order: WireOrder,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireProduct {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub variants: Option<Vec<WireVariant>>,
    #[serde(default)]
    pub images: Option<Vec<WireImage>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireVariant {
    #[serde(default)]
    pub price: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireImage {
    #[serde(default)]
    pub src: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireOrder {
    pub id: u64,
    #[serde(default)]
    pub customer: Option<WireCustomer>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub total_price: Option<String>,
    #[serde(default)]
    pub line_items: Option<Vec<WireLineItem>>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireCustomer {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireLineItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl From<WireProduct> for Product {
    fn from(wire: WireProduct) -> Self {
        Self {
            title: wire.title.unwrap_or_default(),
            handle: ProductHandle(wire.handle.unwrap_or_default()),
            description: non_blank(wire.body_html),
            variant_prices: wire
                .variants
                .unwrap_or_default()
                .into_iter()
                .filter_map(|variant| non_blank(variant.price))
                .collect(),
            image_urls: wire
                .images
                .unwrap_or_default()
                .into_iter()
                .filter_map(|image| non_blank(image.src))
                .collect(),
        }
    }
}

impl From<WireCustomer> for OrderCustomer {
    fn from(wire: WireCustomer) -> Self {
        Self {
            id: wire.id,
            first_name: wire.first_name.unwrap_or_default(),
            last_name: wire.last_name.unwrap_or_default(),
        }
    }
}

impl From<WireOrder> for Order {
    fn from(wire: WireOrder) -> Self {
        Self {
            id: OrderId(wire.id),
            customer: wire.customer.map(OrderCustomer::from),
            financial_status: non_blank(wire.financial_status),
            total_price: non_blank(wire.total_price).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            line_items: wire
                .line_items
                .unwrap_or_default()
                .into_iter()
                .map(|item| OrderLineItem {
                    title: item.title.unwrap_or_default(),
                    quantity: item.quantity.unwrap_or(0),
                })
                .collect(),
            note: non_blank(wire.note),
            fulfillment_status: non_blank(wire.fulfillment_status),
            created_at: non_blank(wire.created_at).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }
}
