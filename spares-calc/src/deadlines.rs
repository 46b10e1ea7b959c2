use chrono::{DateTime, Duration, Utc};

use crate::timestamp::Moment;

/// Days between order placement and the default expected delivery.
pub const DELIVERY_LEAD_DAYS: i64 = 7;

/// Days natural rubber may sit in stock before it must be consumed.
pub const NATURAL_RUBBER_SHELF_DAYS: i64 = 5;

/// Payment terms on issued invoices.
pub const INVOICE_PAYMENT_DAYS: i64 = 30;

/// The only order status with special meaning.
pub const DELIVERED: &str = "Delivered";

pub fn expected_delivery(order_date: DateTime<Utc>) -> DateTime<Utc> {
    order_date + Duration::days(DELIVERY_LEAD_DAYS)
}

/// Case-insensitive match used when a material is recorded.
pub fn is_natural_rubber(rubber_type: &str) -> bool {
    rubber_type.to_lowercase() == "natural"
}

pub fn consumption_deadline(arrival_date: DateTime<Utc>, rubber_type: &str) -> Option<DateTime<Utc>> {
    if is_natural_rubber(rubber_type) {
        Some(arrival_date + Duration::days(NATURAL_RUBBER_SHELF_DAYS))
    } else {
        None
    }
}

pub fn invoice_due_date(issue_date: DateTime<Utc>) -> DateTime<Utc> {
    issue_date + Duration::days(INVOICE_PAYMENT_DAYS)
}

/// An order is late when it is not delivered and `now` is strictly past
/// its expected date.
pub fn is_delayed(now: impl Into<Moment>, expected_date: impl Into<Moment>, status: &str) -> bool {
    status != DELIVERED && now.into().is_after(&expected_date.into())
}

/// A material is overdue when it has not been consumed and `now` is
/// strictly past its deadline.
pub fn is_overdue_unconsumed(
    now: impl Into<Moment>,
    deadline: impl Into<Moment>,
    consumption_date: Option<Moment>,
) -> bool {
    consumption_date.is_none() && now.into().is_after(&deadline.into())
}
