use async_trait::async_trait;
use spares_shared::models::events::{Notification, NotificationKind};
use spares_shared::pii::MaskedRecipients;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::NotifyError;

/// Delivers a notification to a list of recipients.
///
/// Callers in the lifecycle engine treat every failure as best-effort:
/// the error is logged at the call site and never propagated.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(
        &self,
        recipients: &[String],
        notification: &Notification,
    ) -> Result<(), NotifyError>;
}

/// Dispatcher used when no delivery backend is configured. Only logs.
#[derive(Debug, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(
        &self,
        recipients: &[String],
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            kind = notification.kind().as_str(),
            recipients = %MaskedRecipients(recipients),
            subject = %notification.subject(),
            "Notification delivery skipped (no backend configured)"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub recipients: Vec<String>,
    pub notification: Notification,
}

/// Records everything it is asked to send. Kinds listed via
/// [`RecordingDispatcher::fail_on`] are rejected instead, which lets
/// callers exercise their failure handling.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<Dispatched>>,
    failing: Mutex<HashSet<NotificationKind>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, kind: NotificationKind) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind);
    }

    pub fn sent(&self) -> Vec<Dispatched> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn sent_of(&self, kind: NotificationKind) -> Vec<Dispatched> {
        self.sent()
            .into_iter()
            .filter(|d| d.notification.kind() == kind)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(
        &self,
        recipients: &[String],
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        let kind = notification.kind();
        if self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&kind)
        {
            return Err(NotifyError::Transport(format!(
                "simulated failure for {}",
                kind.as_str()
            )));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Dispatched {
                recipients: recipients.to_vec(),
                notification: notification.clone(),
            });
        Ok(())
    }
}
