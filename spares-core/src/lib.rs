pub mod activity;
pub mod clock;
pub mod notify;
pub mod repository;

pub use activity::ActivityLog;
pub use clock::{Clock, FixedClock, SystemClock};
pub use notify::NotificationDispatcher;
pub use repository::{Collection, DocStream, DocumentStore, Filter, FilterOp};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend failure: {0}")]
    Backend(String),
    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid document in {collection}: {reason}")]
    InvalidDocument {
        collection: &'static str,
        reason: String,
    },
    #[error("Document {id} not found in {collection}")]
    NotFound { collection: &'static str, id: String },
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification transport failed: {0}")]
    Transport(String),
    #[error("Notification rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Activity log append failed: {0}")]
    Transport(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
