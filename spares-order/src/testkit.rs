use chrono::{DateTime, TimeZone, Utc};
use spares_core::activity::RecordingLog;
use spares_core::notify::RecordingDispatcher;
use spares_core::FixedClock;
use spares_store::MemoryStore;
use std::sync::Arc;

use crate::manager::{LifecycleConfig, LifecycleEngine};
use crate::models::{NewUser, User};

pub(crate) fn utc(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, 0, 0, 0).unwrap()
}

pub(crate) fn staff() -> Vec<String> {
    vec![
        "desk@example.com".to_string(),
        "floor@example.com".to_string(),
        "accounts@example.com".to_string(),
    ]
}

pub(crate) struct Harness {
    pub engine: LifecycleEngine,
    pub store: Arc<MemoryStore>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub log: Arc<RecordingLog>,
    pub clock: Arc<FixedClock>,
}

/// Engine over in-memory collaborators with the clock at 2024-01-01.
pub(crate) fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let log = Arc::new(RecordingLog::new());
    let clock = Arc::new(FixedClock::new(utc(2024, 1, 1)));
    let engine = LifecycleEngine::new(
        store.clone(),
        dispatcher.clone(),
        log.clone(),
        clock.clone(),
        LifecycleConfig {
            staff_recipients: staff(),
        },
    );
    Harness {
        engine,
        store,
        dispatcher,
        log,
        clock,
    }
}

impl Harness {
    pub async fn customer(&self, name: &str) -> User {
        self.engine
            .create_user(NewUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                phone: Some("9000000000".to_string()),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap()
            .unwrap()
    }
}
