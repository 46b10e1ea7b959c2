use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::{Map, Value};

use crate::StoreResult;

/// Document collections, one per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Orders,
    RawMaterials,
    Invoices,
    InvoiceLineItems,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Orders,
        Collection::RawMaterials,
        Collection::Invoices,
        Collection::InvoiceLineItems,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Orders => "orders",
            Collection::RawMaterials => "raw_materials",
            Collection::Invoices => "invoices",
            Collection::InvoiceLineItems => "invoice_line_items",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Gt,
    /// Field is absent or explicitly null. The filter value is ignored.
    IsNull,
}

/// Single-field predicate. Multiple filters on one query are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Ne, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lt, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gt, value)
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOp::IsNull, Value::Null)
    }
}

pub type DocStream<'a> = BoxStream<'a, StoreResult<Value>>;

/// Repository contract for the document store.
///
/// Records are JSON objects. The store assigns the identifier on insert
/// and writes it back into the body under `id`. No cross-collection
/// transactions and no referential integrity are provided.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new record and return its store-assigned id.
    async fn insert(&self, collection: Collection, record: Value) -> StoreResult<String>;

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Value>>;

    /// Stream every record matching all `filters`, in insertion order.
    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> StoreResult<DocStream<'static>>;

    /// Merge `fields` into an existing record. Missing ids are an error.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<()>;

    /// Remove a record. Returns whether it existed.
    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<bool>;
}
