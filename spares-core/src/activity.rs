use async_trait::async_trait;
use spares_shared::models::activity::ActivityRow;
use std::sync::Mutex;

use crate::LedgerError;

/// Append-only operational log (the orders and inventory spreadsheets).
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn append(&self, row: &ActivityRow) -> Result<(), LedgerError>;
}

#[derive(Debug, Default)]
pub struct LogActivity;

#[async_trait]
impl ActivityLog for LogActivity {
    async fn append(&self, row: &ActivityRow) -> Result<(), LedgerError> {
        tracing::info!(sheet = row.sheet(), cells = ?row.cells(), "Activity row recorded");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingLog {
    rows: Mutex<Vec<ActivityRow>>,
    failing: Mutex<bool>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<ActivityRow> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap_or_else(|e| e.into_inner()) = failing;
    }
}

#[async_trait]
impl ActivityLog for RecordingLog {
    async fn append(&self, row: &ActivityRow) -> Result<(), LedgerError> {
        if *self.failing.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(LedgerError::Transport("sheet unavailable".to_string()));
        }
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(row.clone());
        Ok(())
    }
}
