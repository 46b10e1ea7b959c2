use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row appended to the orders sheet when an order is placed.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct OrderLogRow {
    pub order_id: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub product: String,
    pub quantity: i64,
    pub order_date: DateTime<Utc>,
}

/// Row appended to the inventory sheet when raw material arrives.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct InventoryLogRow {
    pub order_id: Option<String>,
    pub batch_no: String,
    pub recipe_no: String,
    pub quantity: f64,
    pub rubber_type: String,
    pub arrival_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "sheet", content = "row")]
pub enum ActivityRow {
    Orders(OrderLogRow),
    Inventory(InventoryLogRow),
}

impl ActivityRow {
    pub fn sheet(&self) -> &'static str {
        match self {
            ActivityRow::Orders(_) => "Orders",
            ActivityRow::Inventory(_) => "Inventory",
        }
    }

    /// Cell values in column order. Dates are written as `YYYY-MM-DD`.
    pub fn cells(&self) -> Vec<String> {
        match self {
            ActivityRow::Orders(r) => vec![
                r.order_id.clone(),
                r.customer_name.clone(),
                r.customer_phone.clone().unwrap_or_default(),
                r.product.clone(),
                r.quantity.to_string(),
                r.order_date.format("%Y-%m-%d").to_string(),
            ],
            ActivityRow::Inventory(r) => vec![
                r.order_id.clone().unwrap_or_default(),
                r.batch_no.clone(),
                r.recipe_no.clone(),
                r.quantity.to_string(),
                r.rubber_type.clone(),
                r.arrival_date.format("%Y-%m-%d").to_string(),
            ],
        }
    }
}
