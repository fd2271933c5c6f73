//! Kafka notification producer
//!
//! Publishes stock notifications as JSON, keyed by product id so every
//! notification for a product lands on the same partition.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::Serialize;
use std::time::Duration;

use super::NotificationSink;
use crate::error::{AppError, SinkError};
use crate::models::{Notification, ProductId, Quantity};
use crate::shutdown::Shutdown;

/// Wire format of a published notification
#[derive(Debug, Serialize)]
struct NotificationMessage<'a> {
    #[serde(rename = "type")]
    notification_type: &'a str,
    product_id: ProductId,
    quantity: Quantity,
}

/// Serialize a notification as `{"type":..,"product_id":..,"quantity":..}`
pub fn encode_notification(notification: &Notification) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&NotificationMessage {
        notification_type: notification.kind.as_str(),
        product_id: notification.product_id,
        quantity: notification.quantity,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaSinkConfig {
    pub brokers: String,
    pub topic: String,
    /// Delivery timeout for a single notification
    pub message_timeout: Duration,
}

impl Default for KafkaSinkConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            topic: "stock-notifications".to_string(),
            message_timeout: Duration::from_secs(5),
        }
    }
}

/// Sink that writes notifications to a Kafka topic
pub struct KafkaNotificationSink {
    producer: FutureProducer,
    topic: String,
    message_timeout: Duration,
}

impl KafkaNotificationSink {
    pub fn new(config: &KafkaSinkConfig) -> Result<Self, AppError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set(
                "message.timeout.ms",
                config.message_timeout.as_millis().to_string(),
            )
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .create()?;

        tracing::info!(
            brokers = %config.brokers,
            topic = %config.topic,
            "Notification sink initialized"
        );

        Ok(Self {
            producer,
            topic: config.topic.clone(),
            message_timeout: config.message_timeout,
        })
    }
}

#[async_trait]
impl NotificationSink for KafkaNotificationSink {
    async fn write_notification(
        &self,
        shutdown: &Shutdown,
        notification: &Notification,
    ) -> Result<(), SinkError> {
        let payload = encode_notification(notification)?;
        let key = notification.product_id.to_string();

        let record = FutureRecord::to(&self.topic).key(&key).payload(&payload);

        let delivery = tokio::select! {
            _ = shutdown.cancelled() => return Err(SinkError::Cancelled),
            delivery = self.producer.send(record, self.message_timeout) => delivery,
        };

        match delivery {
            Ok((partition, offset)) => {
                tracing::debug!(
                    product_id = notification.product_id,
                    notification_type = %notification.kind,
                    partition = partition,
                    offset = offset,
                    "Notification published to Kafka"
                );
                Ok(())
            }
            Err((e, _)) => Err(SinkError::Transport(format!(
                "Failed to publish to Kafka: {}",
                e
            ))),
        }
    }
}
