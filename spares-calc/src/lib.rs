//! Deadline and tax arithmetic for orders, raw materials and invoices.
//!
//! Everything here is pure: callers pass in "now" and any randomness.

pub mod deadlines;
pub mod numbering;
pub mod tax;
pub mod timestamp;
pub mod words;

pub use deadlines::{
    consumption_deadline, expected_delivery, invoice_due_date, is_delayed,
    is_overdue_unconsumed,
};
pub use numbering::generate_invoice_number;
pub use tax::{compute_invoice_totals, compute_line_item, InvoiceTotals, LineAmounts, TaxRates};
pub use timestamp::Moment;
pub use words::amount_in_words;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalcError {
    #[error("Unrecognized timestamp '{input}': expected ISO-8601 or '%Y-%m-%d %H:%M:%S'")]
    Timestamp { input: String },
}
