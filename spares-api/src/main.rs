use std::net::SocketAddr;
use std::sync::Arc;

use spares_api::{app, metrics::{MeteredDispatcher, Metrics}, worker, AppState};
use spares_core::activity::LogActivity;
use spares_core::notify::LogDispatcher;
use spares_core::{ActivityLog, DocumentStore, NotificationDispatcher, SystemClock};
use spares_order::{LifecycleConfig, LifecycleEngine, NewUser};
use spares_store::{Config, MemoryStore, PgDocumentStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Outbound = (Arc<dyn NotificationDispatcher>, Arc<dyn ActivityLog>);

#[cfg(feature = "kafka")]
fn outbound(config: &Config) -> Outbound {
    if let Some(brokers) = config.kafka.brokers.as_deref() {
        let producer = Arc::new(
            spares_store::EventProducer::new(
                brokers,
                &config.kafka.notification_topic,
                &config.kafka.activity_topic,
            )
            .expect("Failed to create Kafka producer"),
        );
        tracing::info!("Publishing notifications and activity to Kafka");
        let dispatcher: Arc<dyn NotificationDispatcher> = producer.clone();
        return (dispatcher, producer);
    }
    (Arc::new(LogDispatcher), Arc::new(LogActivity))
}

#[cfg(not(feature = "kafka"))]
fn outbound(_config: &Config) -> Outbound {
    (Arc::new(LogDispatcher), Arc::new(LogActivity))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spares_api=debug,spares_order=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting spares API on port {}", config.server.port);

    let store: Arc<dyn DocumentStore> = match config.database.url.as_deref() {
        Some(url) => {
            let db = PgDocumentStore::new(url, config.database.max_connections)
                .await
                .expect("Failed to connect to Postgres");
            db.migrate().await.expect("Failed to run migrations");
            Arc::new(db)
        }
        None => {
            tracing::warn!("No database configured, records are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let metrics = Arc::new(Metrics::new().expect("Failed to register metrics"));
    let (dispatcher, activity) = outbound(&config);
    let dispatcher = Arc::new(MeteredDispatcher::new(dispatcher, metrics.clone()));

    let engine = Arc::new(LifecycleEngine::new(
        store,
        dispatcher,
        activity,
        Arc::new(SystemClock),
        LifecycleConfig {
            staff_recipients: config.notifications.staff_recipients.clone(),
        },
    ));

    if let Some(admin) = config.bootstrap_admin.clone() {
        let seed = NewUser {
            name: admin.name,
            email: admin.email,
            phone: None,
            password_hash: admin.password_hash,
        };
        match engine.ensure_default_admin(seed).await {
            Ok(user) => tracing::info!(user_id = %user.id, "Default admin ready"),
            Err(e) => tracing::error!(error = %e, "Could not create the default admin"),
        }
    }

    let app_state = AppState { engine, metrics };

    if config.schedule.enabled {
        worker::spawn_schedulers(&app_state, &config.schedule);
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
