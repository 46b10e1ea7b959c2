//! Order, raw-material and invoice lifecycle for the spares workshop.

pub mod invoices;
pub mod manager;
pub mod materials;
pub mod models;
pub mod orders;
pub mod sweeps;
pub mod users;

#[cfg(test)]
pub(crate) mod testkit;

pub use manager::{LifecycleConfig, LifecycleEngine, LifecycleError, LifecycleResult};
pub use models::{
    Invoice, InvoiceLineItem, NewGstInvoice, NewLineItem, NewRawMaterial, NewUser, Order,
    OrderStatus, OrderView, RawMaterial, Role, User,
};
pub use sweeps::SweepReport;
