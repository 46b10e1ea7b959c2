use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spares_calc::deadlines::DELIVERED;
use spares_calc::timestamp::{flexible, flexible_option};
use spares_calc::{InvoiceTotals, LineAmounts, TaxRates};
use std::fmt;

/// Access level. Only admins may run staff operations.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Opaque hash produced by the auth service.
    #[serde(default)]
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Order status as entered by staff. Any text is accepted; only
/// [`OrderStatus::DELIVERED`] changes engine behavior.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderStatus(String);

impl OrderStatus {
    pub const PENDING: &'static str = "Pending";
    pub const IN_PROGRESS: &'static str = "InProgress";
    pub const DELIVERED: &'static str = DELIVERED;

    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn pending() -> Self {
        Self::new(Self::PENDING)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_delivered(&self) -> bool {
        self.0 == Self::DELIVERED
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for OrderStatus {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for OrderStatus {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub product: String,
    pub quantity: i64,
    pub status: OrderStatus,
    #[serde(with = "flexible")]
    pub order_date: DateTime<Utc>,
    #[serde(default, with = "flexible_option")]
    pub expected_delivery_date: Option<DateTime<Utc>>,
}

/// Order row for staff listings, joined with the owner's contact details.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub user_name: String,
    pub user_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawMaterial {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    pub batch_no: String,
    pub recipe_no: String,
    pub raw_material_quantity: f64,
    #[serde(default = "default_rubber_type")]
    pub rubber_type: String,
    #[serde(with = "flexible")]
    pub arrival_date: DateTime<Utc>,
    #[serde(default, with = "flexible_option")]
    pub consumption_date: Option<DateTime<Utc>>,
    #[serde(default, with = "flexible_option")]
    pub consumption_deadline: Option<DateTime<Utc>>,
}

fn default_rubber_type() -> String {
    "Natural".to_string()
}

impl RawMaterial {
    pub fn is_consumed(&self) -> bool {
        self.consumption_date.is_some()
    }
}

pub const INVOICE_PENDING: &str = "Pending";

/// A tax invoice. The customer fields are a snapshot taken at creation.
///
/// Invoices raised straight from an order carry `product`, `quantity`
/// and `unit_price` with a flat `total_tax`; GST invoices carry line
/// items and the per-class totals instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    pub invoice_number: String,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_gstin: Option<String>,
    #[serde(default)]
    pub customer_address: Option<String>,
    #[serde(default)]
    pub delivery_note_no: Option<String>,
    #[serde(default)]
    pub buyer_order_no: Option<String>,
    #[serde(default)]
    pub dispatch_through: Option<String>,
    #[serde(default)]
    pub dispatch_doc_no: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(flatten)]
    pub totals: InvoiceTotals,
    #[serde(default)]
    pub amount_in_words: String,
    pub status: String,
    #[serde(with = "flexible")]
    pub issue_date: DateTime<Utc>,
    #[serde(with = "flexible")]
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Attached on read; never stored on the invoice document.
    #[serde(default)]
    pub line_items: Vec<InvoiceLineItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceLineItem {
    #[serde(default)]
    pub id: String,
    pub invoice_id: String,
    pub hsn_code: String,
    pub description: String,
    pub quantity: i64,
    pub rate: f64,
    #[serde(flatten)]
    pub rates: TaxRates,
    #[serde(flatten)]
    pub amounts: LineAmounts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRawMaterial {
    #[serde(default)]
    pub order_id: Option<String>,
    pub batch_no: String,
    pub recipe_no: String,
    pub raw_material_quantity: f64,
    #[serde(default = "default_rubber_type")]
    pub rubber_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLineItem {
    pub hsn_code: String,
    pub description: String,
    pub quantity: i64,
    pub rate: f64,
    #[serde(flatten)]
    pub rates: TaxRates,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewGstInvoice {
    #[serde(default)]
    pub order_id: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_gstin: Option<String>,
    #[serde(default)]
    pub customer_address: Option<String>,
    #[serde(default)]
    pub delivery_note_no: Option<String>,
    #[serde(default)]
    pub buyer_order_no: Option<String>,
    #[serde(default)]
    pub dispatch_through: Option<String>,
    #[serde(default)]
    pub dispatch_doc_no: Option<String>,
    pub line_items: Vec<NewLineItem>,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_is_open_text() {
        let order: Order = serde_json::from_value(json!({
            "id": "o1",
            "user_id": "u1",
            "product": "O-ring 40mm",
            "quantity": 500,
            "status": "Awaiting mould",
            "order_date": "2024-01-01 00:00:00"
        }))
        .unwrap();
        assert_eq!(order.status, "Awaiting mould");
        assert!(!order.status.is_delivered());
        assert!(order.expected_delivery_date.is_none());
        assert!(OrderStatus::new("Delivered").is_delivered());
    }

    #[test]
    fn test_role_defaults_to_customer() {
        let user: User = serde_json::from_value(json!({
            "name": "Ravi",
            "email": "ravi@example.com"
        }))
        .unwrap();
        assert_eq!(user.role, Role::Customer);
        let admin: User = serde_json::from_value(json!({
            "name": "Desk",
            "email": "desk@example.com",
            "role": "admin"
        }))
        .unwrap();
        assert!(admin.is_admin());
    }

    #[test]
    fn test_line_item_document_is_flat() {
        let item = InvoiceLineItem {
            id: "li1".to_string(),
            invoice_id: "inv1".to_string(),
            hsn_code: "4016".to_string(),
            description: "Rubber gasket".to_string(),
            quantity: 10,
            rate: 100.0,
            rates: TaxRates::intra_state(9.0, 9.0),
            amounts: spares_calc::compute_line_item(10.0, 100.0, TaxRates::intra_state(9.0, 9.0)),
        };
        let doc = serde_json::to_value(&item).unwrap();
        assert_eq!(doc["cgst_percent"], 9.0);
        assert_eq!(doc["cgst_amount"], 90.0);
        assert_eq!(doc["total_with_tax"], 1180.0);

        let back: InvoiceLineItem = serde_json::from_value(doc).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_line_item_input_defaults_missing_rates() {
        let item: NewLineItem = serde_json::from_value(json!({
            "hsn_code": "4016",
            "description": "Seal",
            "quantity": 3,
            "rate": 12.5,
            "igst_percent": 18
        }))
        .unwrap();
        assert_eq!(item.rates, TaxRates::inter_state(18.0));
    }
}
