pub mod app_config;
pub mod database;
#[cfg(feature = "kafka")]
pub mod events;
pub mod memory;

pub use app_config::Config;
pub use database::PgDocumentStore;
#[cfg(feature = "kafka")]
pub use events::EventProducer;
pub use memory::MemoryStore;
