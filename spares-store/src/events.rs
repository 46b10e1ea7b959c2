use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use serde::Serialize;
use spares_core::{ActivityLog, LedgerError, NotificationDispatcher, NotifyError};
use spares_shared::models::activity::ActivityRow;
use spares_shared::models::events::Notification;
use spares_shared::pii::MaskedRecipients;
use std::time::Duration;
use tracing::{error, info};

/// Publishes outbound mail and activity rows for the delivery workers
/// that own SMTP and the spreadsheet.
#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
    notification_topic: String,
    activity_topic: String,
}

#[derive(Serialize)]
struct MailEnvelope<'a> {
    recipients: &'a [String],
    subject: String,
    body: String,
    notification: &'a Notification,
}

impl EventProducer {
    pub fn new(
        brokers: &str,
        notification_topic: impl Into<String>,
        activity_topic: impl Into<String>,
    ) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self {
            producer,
            notification_topic: notification_topic.into(),
            activity_topic: activity_topic.into(),
        })
    }

    pub async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!(
                    "Sent message to {}/{}: partition {} offset {}",
                    topic, key, delivery.partition, delivery.offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl NotificationDispatcher for EventProducer {
    async fn send(&self, recipients: &[String], notification: &Notification) -> Result<(), NotifyError> {
        if recipients.is_empty() {
            return Err(NotifyError::Rejected("no recipients".to_string()));
        }
        let envelope = MailEnvelope {
            recipients,
            subject: notification.subject(),
            body: notification.plain_text(),
            notification,
        };
        let payload = serde_json::to_string(&envelope).map_err(|e| NotifyError::Transport(e.to_string()))?;

        info!(
            kind = notification.kind().as_str(),
            recipients = %MaskedRecipients(recipients),
            "Publishing notification"
        );
        self.publish(&self.notification_topic, notification.order_id().unwrap_or("-"), &payload)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))
    }
}

#[async_trait]
impl ActivityLog for EventProducer {
    async fn append(&self, row: &ActivityRow) -> Result<(), LedgerError> {
        let payload = serde_json::to_string(row).map_err(|e| LedgerError::Transport(e.to_string()))?;
        self.publish(&self.activity_topic, row.sheet(), &payload)
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))
    }
}
