use chrono::{DateTime, SubsecRound, Utc};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use spares_calc::CalcError;
use spares_core::repository::{Collection, DocumentStore, Filter};
use spares_core::{ActivityLog, Clock, NotificationDispatcher, StoreError};
use spares_shared::models::activity::ActivityRow;
use spares_shared::models::events::Notification;
use spares_shared::pii::MaskedRecipients;
use std::sync::Arc;
use tracing::warn;

use crate::models::User;

/// Settings injected at construction.
#[derive(Debug, Clone, Default)]
pub struct LifecycleConfig {
    /// Copied on customer mail and the only audience of stock alerts.
    pub staff_recipients: Vec<String>,
}

/// Orchestrates orders, raw materials and invoices over a document store
/// and decides which notifications each change fires.
///
/// Notifications and activity rows are best-effort. A failed send is
/// logged and dropped and never fails or rolls back the write that
/// triggered it. Multi-document writes are not transactional.
pub struct LifecycleEngine {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) dispatcher: Arc<dyn NotificationDispatcher>,
    pub(crate) activity: Arc<dyn ActivityLog>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: LifecycleConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Malformed {collection} document: {reason}")]
    Decode {
        collection: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Calc(#[from] CalcError),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

pub(crate) fn require(condition: bool, message: &str) -> LifecycleResult<()> {
    if condition {
        Ok(())
    } else {
        Err(LifecycleError::Validation(message.to_string()))
    }
}

pub(crate) fn decode<T: DeserializeOwned>(collection: Collection, doc: Value) -> LifecycleResult<T> {
    serde_json::from_value(doc).map_err(|e| LifecycleError::Decode {
        collection: collection.name(),
        reason: e.to_string(),
    })
}

/// Serializes an entity for insertion. The store owns `id`.
pub(crate) fn to_document<T: Serialize>(entity: &T) -> LifecycleResult<Map<String, Value>> {
    match serde_json::to_value(entity).map_err(StoreError::from)? {
        Value::Object(mut body) => {
            body.remove("id");
            Ok(body)
        }
        _ => Err(LifecycleError::Validation(
            "entity does not serialize to an object".to_string(),
        )),
    }
}

pub(crate) fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        activity: Arc<dyn ActivityLog>,
        clock: Arc<dyn Clock>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            activity,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Current time at the precision documents are stored with.
    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(6)
    }

    pub(crate) async fn load<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
    ) -> LifecycleResult<Option<T>> {
        match self.store.get(collection, id).await? {
            Some(doc) => decode(collection, doc).map(Some),
            None => Ok(None),
        }
    }

    pub(crate) async fn load_all<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> LifecycleResult<Vec<T>> {
        let mut stream = self.store.query(collection, filters).await?;
        let mut out = Vec::new();
        while let Some(doc) = stream.next().await {
            out.push(decode(collection, doc?)?);
        }
        Ok(out)
    }

    pub(crate) async fn count(&self, collection: Collection, filters: &[Filter]) -> LifecycleResult<usize> {
        let mut stream = self.store.query(collection, filters).await?;
        let mut n = 0;
        while let Some(doc) = stream.next().await {
            doc?;
            n += 1;
        }
        Ok(n)
    }

    /// Inserts the entity and returns the store-assigned id.
    pub(crate) async fn persist<T: Serialize>(
        &self,
        collection: Collection,
        entity: &T,
    ) -> LifecycleResult<String> {
        let body = to_document(entity)?;
        Ok(self.store.insert(collection, Value::Object(body)).await?)
    }

    /// Owner lookup for notifications. A lookup failure is logged and
    /// treated as an unknown user.
    pub(crate) async fn resolve_user(&self, user_id: &str) -> Option<User> {
        match self.load::<User>(Collection::Users, user_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(user_id, error = %e, "Could not resolve user for notification");
                None
            }
        }
    }

    pub(crate) fn customer_and_staff(&self, user: &User) -> Vec<String> {
        let mut recipients = Vec::with_capacity(self.config.staff_recipients.len() + 1);
        recipients.push(user.email.clone());
        recipients.extend(self.config.staff_recipients.iter().cloned());
        recipients
    }

    /// Sends and reports whether delivery succeeded. Never fails.
    pub(crate) async fn notify(&self, recipients: &[String], notification: Notification) -> bool {
        match self.dispatcher.send(recipients, &notification).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    kind = notification.kind().as_str(),
                    order_id = notification.order_id().unwrap_or("-"),
                    recipients = %MaskedRecipients(recipients),
                    error = %e,
                    "Notification failed"
                );
                false
            }
        }
    }

    pub(crate) async fn record_activity(&self, row: ActivityRow) {
        if let Err(e) = self.activity.append(&row).await {
            warn!(sheet = row.sheet(), error = %e, "Activity log append failed");
        }
    }
}
