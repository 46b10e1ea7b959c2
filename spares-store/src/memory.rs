use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde_json::{Map, Value};
use spares_calc::Moment;
use spares_core::repository::{Collection, DocStream, DocumentStore, Filter, FilterOp};
use spares_core::{StoreError, StoreResult};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local document store. Used when no database is configured and
/// by the engine tests.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map_or(0, Vec::len)
    }
}

fn id_of(doc: &Value) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

/// Numbers compare numerically. Strings compare as instants when both
/// sides parse as timestamps, otherwise lexically. Anything else is only
/// comparable for equality.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => match (Moment::parse(a), Moment::parse(b)) {
            (Ok(a), Ok(b)) => Some(a.cmp(&b)),
            _ => Some(a.cmp(b)),
        },
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (a, b) if a == b => Some(Ordering::Equal),
        _ => None,
    }
}

pub(crate) fn matches(doc: &Value, filter: &Filter) -> bool {
    let field = doc.get(&filter.field).filter(|v| !v.is_null());
    match (filter.op, field) {
        (FilterOp::IsNull, field) => field.is_none(),
        (_, None) => false,
        (FilterOp::Eq, Some(v)) => compare(v, &filter.value) == Some(Ordering::Equal),
        (FilterOp::Ne, Some(v)) => compare(v, &filter.value) != Some(Ordering::Equal),
        (FilterOp::Lt, Some(v)) => compare(v, &filter.value) == Some(Ordering::Less),
        (FilterOp::Gt, Some(v)) => compare(v, &filter.value) == Some(Ordering::Greater),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: Collection, record: Value) -> StoreResult<String> {
        let Value::Object(mut body) = record else {
            return Err(StoreError::InvalidDocument {
                collection: collection.name(),
                reason: "record is not a JSON object".to_string(),
            });
        };
        let id = Uuid::new_v4().simple().to_string();
        body.insert("id".to_string(), Value::String(id.clone()));

        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .push(Value::Object(body));
        Ok(id)
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Value>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| id_of(d) == Some(id)))
            .cloned())
    }

    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> StoreResult<DocStream<'static>> {
        // Snapshot under the read lock; the stream itself holds no lock.
        let snapshot: Vec<StoreResult<Value>> = {
            let guard = self.collections.read().await;
            guard
                .get(&collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|d| filters.iter().all(|f| matches(d, f)))
                        .cloned()
                        .map(Ok)
                        .collect()
                })
                .unwrap_or_default()
        };
        Ok(stream::iter(snapshot).boxed())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<()> {
        let mut guard = self.collections.write().await;
        let doc = guard
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| id_of(d) == Some(id)))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.name(),
                id: id.to_string(),
            })?;

        if let Value::Object(body) = doc {
            for (key, value) in fields {
                // The id is store-owned.
                if key != "id" {
                    body.insert(key, value);
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<bool> {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(&collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| id_of(d) != Some(id));
        Ok(docs.len() != before)
    }
}
