use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use storefront_core::{CatalogSource, Order, OrderId, OrderSource, Product, NOT_AVAILABLE};

use super::Tool;

/// Lists the live catalog as plain text blocks for the model.
pub struct ProductsTool {
    catalog: Arc<dyn CatalogSource>,
    shop_base_url: String,
}

impl ProductsTool {
    pub fn new(catalog: Arc<dyn CatalogSource>, shop_base_url: impl Into<String>) -> Self {
        Self { catalog, shop_base_url: shop_base_url.into() }
    }
}

#[async_trait]
impl Tool for ProductsTool {
    fn name(&self) -> &'static str {
        "shopify_products"
    }

    fn description(&self) -> &'static str {
        "Access real-time product data including names, descriptions, prices, and URLs of products."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "What the shopper is looking for." }
            }
        })
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        // The whole catalog is returned; the model does the narrowing.
        Ok(match self.catalog.fetch_catalog().await {
            Ok(products) => format_products(&products, &self.shop_base_url),
            Err(error) => format!("Error accessing Shopify: {error}"),
        })
    }
}

pub fn format_products(products: &[Product], shop_base_url: &str) -> String {
    if products.is_empty() {
        return "No products found in store.".to_string();
    }

    products
        .iter()
        .map(|product| {
            format!(
                "Product: {}\nDescription: {}\nPrices: {}\nURL: {}\n---",
                product.title,
                product.description_or_default(),
                product.variant_prices.join(", "),
                product.url(shop_base_url),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Looks up one order by id, or lists every order when no id is given.
pub struct OrdersTool {
    orders: Arc<dyn OrderSource>,
}

impl OrdersTool {
    pub fn new(orders: Arc<dyn OrderSource>) -> Self {
        Self { orders }
    }

    async fn lookup(&self, raw_id: &str) -> String {
        let Some(id) = parse_order_id(raw_id) else {
            return format!("No order found with ID: {raw_id}.");
        };
        match self.orders.find_order(id).await {
            Ok(Some(order)) => format_order(&order),
            Ok(None) => format!("No order found with ID: {raw_id}."),
            Err(error) => format!("Error accessing Shopify: {error}"),
        }
    }

    async fn list(&self) -> String {
        match self.orders.list_orders().await {
            Ok(orders) if orders.is_empty() => "No orders found in store.".to_string(),
            Ok(orders) => orders.iter().map(format_order).collect::<Vec<_>>().join("\n\n"),
            Err(error) => format!("Error accessing Shopify: {error}"),
        }
    }
}

#[async_trait]
impl Tool for OrdersTool {
    fn name(&self) -> &'static str {
        "shopify_orders"
    }

    fn description(&self) -> &'static str {
        "Access real-time order data including order status, amount, customer information, \
         delivery status, notes, and total items. Pass order_id to look up a single order."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "order_id": { "type": "string", "description": "Numeric order id, optional." }
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let order_id = match input.get("order_id") {
            Some(Value::String(id)) if !id.trim().is_empty() => Some(id.trim().to_string()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };

        Ok(match order_id {
            Some(id) => self.lookup(&id).await,
            None => self.list().await,
        })
    }
}

fn parse_order_id(raw: &str) -> Option<OrderId> {
    raw.trim().trim_start_matches('#').parse::<u64>().ok().map(OrderId)
}

pub fn format_order(order: &Order) -> String {
    let customer = match &order.customer {
        Some(customer) => {
            let id = customer.id.map(|id| id.to_string());
            format!(
                "{} {} (ID: {})",
                customer.first_name,
                customer.last_name,
                id.as_deref().unwrap_or(NOT_AVAILABLE)
            )
        }
        None => NOT_AVAILABLE.to_string(),
    };

    [
        format!("Order ID: {}", order.id),
        format!("Customer: {customer}"),
        format!("Status: {}", order.financial_status.as_deref().unwrap_or(NOT_AVAILABLE)),
        format!("Amount: {}", order.total_price),
        format!("Products: {}", order.product_titles().join(", ")),
        format!("Total Items: {}", order.total_items()),
        format!("Notes: {}", order.note.as_deref().unwrap_or(NOT_AVAILABLE)),
        format!(
            "Delivery Status: {}",
            order.fulfillment_status.as_deref().unwrap_or(NOT_AVAILABLE)
        ),
        format!("Created At: {}", order.created_at),
    ]
    .join("\n")
}
