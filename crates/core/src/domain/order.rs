use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCustomer {
    pub id: Option<u64>,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub title: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: Option<OrderCustomer>,
    pub financial_status: Option<String>,
    pub total_price: String,
    pub line_items: Vec<OrderLineItem>,
    pub note: Option<String>,
    pub fulfillment_status: Option<String>,
    pub created_at: String,
}

impl Order {
    pub fn total_items(&self) -> u32 {
        self.line_items.iter().map(|item| item.quantity).sum()
    }

    pub fn product_titles(&self) -> Vec<&str> {
        self.line_items.iter().map(|item| item.title.as_str()).collect()
    }
}
