use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// Absent `url` selects the in-memory store.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: Option<String>,
    #[serde(default = "default_notification_topic")]
    pub notification_topic: String,
    #[serde(default = "default_activity_topic")]
    pub activity_topic: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: None,
            notification_topic: default_notification_topic(),
            activity_topic: default_activity_topic(),
        }
    }
}

fn default_notification_topic() -> String {
    "notifications.email".to_string()
}

fn default_activity_topic() -> String {
    "activity.sheets".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Always copied on order, delay and arrival mail; sole audience of
    /// natural-rubber alerts.
    pub staff_recipients: Vec<String>,
}

/// UTC hours at which the daily sweeps run.
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub delay_check_hour: u32,
    #[serde(default = "default_rubber_check_hour")]
    pub rubber_check_hour: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_check_hour: 0,
            rubber_check_hour: default_rubber_check_hour(),
        }
    }
}

fn default_rubber_check_hour() -> u32 {
    6
}

/// Admin account created on start-up when its e-mail is not registered.
/// The hash comes from the external auth service.
#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `SPARES__SERVER__PORT=9000`
            .add_source(
                config::Environment::with_prefix("SPARES")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("notifications.staff_recipients")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = Config::from_toml(
            r#"
            [server]
            port = 8080

            [notifications]
            staff_recipients = ["desk@example.com", "floor@example.com"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.port, 8080);
        assert!(cfg.database.url.is_none());
        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.kafka.notification_topic, "notifications.email");
        assert_eq!(cfg.schedule.delay_check_hour, 0);
        assert_eq!(cfg.schedule.rubber_check_hour, 6);
        assert_eq!(cfg.notifications.staff_recipients.len(), 2);
        assert!(cfg.bootstrap_admin.is_none());
    }

    #[test]
    fn test_full_config() {
        let cfg = Config::from_toml(
            r#"
            [server]
            port = 9000

            [database]
            url = "postgres://spares@localhost/spares"

            [kafka]
            brokers = "localhost:9092"

            [notifications]
            staff_recipients = ["desk@example.com"]

            [schedule]
            enabled = true
            delay_check_hour = 1
            rubber_check_hour = 7

            [bootstrap_admin]
            name = "Admin"
            email = "admin@example.com"
            password_hash = "$argon2id$stub"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.kafka.activity_topic, "activity.sheets");
        assert!(cfg.schedule.enabled);
        assert_eq!(cfg.schedule.rubber_check_hour, 7);
        assert_eq!(cfg.bootstrap_admin.unwrap().email, "admin@example.com");
    }
}
