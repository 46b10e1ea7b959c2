use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, http::header, response::IntoResponse};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use spares_core::{NotificationDispatcher, NotifyError};
use spares_shared::models::events::Notification;

use crate::error::AppError;
use crate::state::AppState;

/// Counters for outbound notifications and scheduled sweeps. Each instance
/// owns its registry so several apps can live in one process.
pub struct Metrics {
    registry: Registry,
    pub notifications: IntCounterVec,
    pub sweep_runs: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let notifications = IntCounterVec::new(
            Opts::new("notifications_total", "Notifications handed to the dispatcher"),
            &["kind", "outcome"],
        )?;
        let sweep_runs = IntCounterVec::new(
            Opts::new("sweep_runs_total", "Completed sweep runs"),
            &["sweep", "outcome"],
        )?;
        registry.register(Box::new(notifications.clone()))?;
        registry.register(Box::new(sweep_runs.clone()))?;
        Ok(Self {
            registry,
            notifications,
            sweep_runs,
        })
    }

    pub fn render(&self) -> Result<String, AppError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| AppError::InternalServerError(e.to_string()))
    }
}

/// Counts every send attempt by kind and outcome, then defers to `inner`.
pub struct MeteredDispatcher {
    inner: Arc<dyn NotificationDispatcher>,
    metrics: Arc<Metrics>,
}

impl MeteredDispatcher {
    pub fn new(inner: Arc<dyn NotificationDispatcher>, metrics: Arc<Metrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl NotificationDispatcher for MeteredDispatcher {
    async fn send(
        &self,
        recipients: &[String],
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        let result = self.inner.send(recipients, notification).await;
        let outcome = if result.is_ok() { "sent" } else { "failed" };
        self.metrics
            .notifications
            .with_label_values(&[notification.kind().as_str(), outcome])
            .inc();
        result
    }
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
