use std::time::Duration;

use crate::error::{AppError, Result};
use crate::services::{KafkaSinkConfig, KafkaSourceConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub source: KafkaSourceConfig,
    pub sink: KafkaSinkConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    /// Port for `/metrics` and `/health`; `None` disables the endpoint
    pub metrics_port: Option<u16>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let brokers = var("KAFKA_BROKERS", "localhost:9092");

        let metrics_port = match lookup("METRICS_PORT") {
            Some(port) if port.trim().is_empty() || port.trim() == "0" => None,
            Some(port) => Some(parse("METRICS_PORT", &port)?),
            None => Some(9100),
        };

        let message_timeout_ms: u64 = parse(
            "KAFKA_MESSAGE_TIMEOUT_MS",
            &var("KAFKA_MESSAGE_TIMEOUT_MS", "5000"),
        )?;

        Ok(Config {
            app: AppConfig {
                env: var("APP_ENV", "development"),
                metrics_port,
            },
            source: KafkaSourceConfig {
                brokers: brokers.clone(),
                group_id: var("KAFKA_GROUP_ID", "stock-notifier"),
                topic: var("CDC_TOPIC", "dbserver1.inventory.products_on_hand"),
                stop_at_eof: parse_bool("CDC_STOP_AT_EOF", &var("CDC_STOP_AT_EOF", "false"))?,
            },
            sink: KafkaSinkConfig {
                brokers,
                topic: var("NOTIFICATION_TOPIC", "stock-notifications"),
                message_timeout: Duration::from_millis(message_timeout_ms),
            },
        })
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("invalid {}={:?}: {}", key, raw, e)))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!(
            "invalid {}={:?}: expected a boolean",
            key, raw
        ))),
    }
}
