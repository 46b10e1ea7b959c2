use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of an outbound notification. Delivery workers route on this.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    OrderConfirmation,
    StatusUpdate,
    DelayNotice,
    MaterialArrival,
    NaturalRubberAlert,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderConfirmation => "order_confirmation",
            NotificationKind::StatusUpdate => "status_update",
            NotificationKind::DelayNotice => "delay_notice",
            NotificationKind::MaterialArrival => "material_arrival",
            NotificationKind::NaturalRubberAlert => "natural_rubber_alert",
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct OrderConfirmedEvent {
    pub order_id: String,
    pub product: String,
    pub quantity: i64,
    pub status: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct OrderStatusChangedEvent {
    pub order_id: String,
    pub status: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct OrderDelayedEvent {
    pub order_id: String,
    pub expected_delivery_date: DateTime<Utc>,
    pub current_status: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct MaterialArrivedEvent {
    pub order_id: String,
    pub batch_no: String,
    pub recipe_no: String,
    pub quantity: f64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct NaturalRubberAlertEvent {
    pub material_id: String,
    pub order_id: Option<String>,
    pub batch_no: String,
    pub consumption_deadline: DateTime<Utc>,
}

/// Payload handed to a notification dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    OrderConfirmation(OrderConfirmedEvent),
    StatusUpdate(OrderStatusChangedEvent),
    DelayNotice(OrderDelayedEvent),
    MaterialArrival(MaterialArrivedEvent),
    NaturalRubberAlert(NaturalRubberAlertEvent),
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::OrderConfirmation(_) => NotificationKind::OrderConfirmation,
            Notification::StatusUpdate(_) => NotificationKind::StatusUpdate,
            Notification::DelayNotice(_) => NotificationKind::DelayNotice,
            Notification::MaterialArrival(_) => NotificationKind::MaterialArrival,
            Notification::NaturalRubberAlert(_) => NotificationKind::NaturalRubberAlert,
        }
    }

    /// Order the notification is about, if any.
    pub fn order_id(&self) -> Option<&str> {
        match self {
            Notification::OrderConfirmation(e) => Some(&e.order_id),
            Notification::StatusUpdate(e) => Some(&e.order_id),
            Notification::DelayNotice(e) => Some(&e.order_id),
            Notification::MaterialArrival(e) => Some(&e.order_id),
            Notification::NaturalRubberAlert(e) => e.order_id.as_deref(),
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notification::OrderConfirmation(e) => {
                format!("Order Confirmation - Order #{}", e.order_id)
            }
            Notification::StatusUpdate(e) => format!("Order #{} Status Update", e.order_id),
            Notification::DelayNotice(e) => format!("Delay Notification - Order #{}", e.order_id),
            Notification::MaterialArrival(e) => {
                format!("Raw Material Arrived - Order #{}", e.order_id)
            }
            Notification::NaturalRubberAlert(e) => format!(
                "Natural Rubber Consumption Overdue - Batch {}",
                e.batch_no
            ),
        }
    }

    /// Plain-text body. HTML rendering belongs to the delivery worker.
    pub fn plain_text(&self) -> String {
        match self {
            Notification::OrderConfirmation(e) => format!(
                "Thank you for your order! Order #{} has been placed.\n\nProduct: {}\nQuantity: {}\nStatus: {}",
                e.order_id, e.product, e.quantity, e.status
            ),
            Notification::StatusUpdate(e) => format!(
                "Your order #{} status has been updated to: {}",
                e.order_id, e.status
            ),
            Notification::DelayNotice(e) => format!(
                "Your order #{} is delayed. Expected delivery: {}. Current status: {}",
                e.order_id,
                e.expected_delivery_date.format("%Y-%m-%d"),
                e.current_status
            ),
            Notification::MaterialArrival(e) => format!(
                "Raw material for order #{} has arrived.\n\nBatch No: {}\nRecipe No: {}\nQuantity: {}",
                e.order_id, e.batch_no, e.recipe_no, e.quantity
            ),
            Notification::NaturalRubberAlert(e) => format!(
                "Natural rubber batch {} (order #{}) passed its consumption deadline of {} and is still unconsumed.",
                e.batch_no,
                e.order_id.as_deref().unwrap_or("-"),
                e.consumption_deadline.format("%Y-%m-%d")
            ),
        }
    }
}
