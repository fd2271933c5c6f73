use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use tracing::{debug, error, info};

use super::models::{decode_record, DecodedRecord};
use crate::error::{AppError, SourceError};
use crate::models::Update;
use crate::services::UpdateSource;
use crate::shutdown::Shutdown;

/// CDC source configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaSourceConfig {
    /// Kafka brokers (comma-separated)
    pub brokers: String,
    /// Consumer group ID
    pub group_id: String,
    /// Debezium topic for the products_on_hand table
    pub topic: String,
    /// Report end of stream once every assigned partition is drained (bounded replays)
    pub stop_at_eof: bool,
}

impl Default for KafkaSourceConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_id: "stock-notifier".to_string(),
            topic: "dbserver1.inventory.products_on_hand".to_string(),
            stop_at_eof: false,
        }
    }
}

/// Partitions that have reported EOF with no message since
#[derive(Debug, Default)]
struct DrainedPartitions {
    partitions: Mutex<HashSet<i32>>,
}

impl DrainedPartitions {
    /// Record an EOF and report whether every assigned partition is drained.
    fn mark_drained(&self, partition: i32, assigned: &HashSet<i32>) -> bool {
        let mut drained = self.partitions.lock().unwrap_or_else(|e| e.into_inner());
        drained.insert(partition);
        !assigned.is_empty() && assigned.is_subset(&drained)
    }

    /// A message arrived, so the partition is live again.
    fn mark_active(&self, partition: i32) {
        self.partitions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&partition);
    }
}

/// Reads inventory updates from a Debezium CDC topic
pub struct KafkaUpdateSource {
    consumer: StreamConsumer,
    topic: String,
    drained: DrainedPartitions,
}

impl KafkaUpdateSource {
    pub fn new(config: &KafkaSourceConfig) -> Result<Self, AppError> {
        info!("Initializing CDC update source with config: {:?}", config);

        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", &config.group_id)
            .set("bootstrap.servers", &config.brokers)
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "5000")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "30000")
            .set("heartbeat.interval.ms", "3000")
            .set(
                "enable.partition.eof",
                if config.stop_at_eof { "true" } else { "false" },
            )
            .create()
            .map_err(|e| {
                error!("Failed to create Kafka consumer: {}", e);
                AppError::Kafka(e)
            })?;

        consumer.subscribe(&[config.topic.as_str()]).map_err(|e| {
            error!("Failed to subscribe to topic: {}", e);
            AppError::Kafka(e)
        })?;

        info!(topic = %config.topic, "CDC update source subscribed");

        Ok(Self {
            consumer,
            topic: config.topic.clone(),
            drained: DrainedPartitions::default(),
        })
    }

    fn assigned_partitions(&self) -> Result<HashSet<i32>, SourceError> {
        let assignment = self.consumer.assignment().map_err(transport_error)?;
        Ok(assignment
            .elements_for_topic(&self.topic)
            .iter()
            .map(|element| element.partition())
            .collect())
    }
}

fn transport_error(e: KafkaError) -> SourceError {
    SourceError::Transport(e.to_string())
}

#[async_trait]
impl UpdateSource for KafkaUpdateSource {
    async fn read_update(&self, shutdown: &Shutdown) -> Result<Option<Update>, SourceError> {
        let msg = loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => return Err(SourceError::Cancelled),
                received = self.consumer.recv() => received,
            };

            match received {
                Ok(msg) => break msg,
                Err(KafkaError::PartitionEOF(partition)) => {
                    let assigned = self.assigned_partitions()?;
                    if self.drained.mark_drained(partition, &assigned) {
                        info!(topic = %self.topic, "All assigned partitions drained");
                        return Err(SourceError::EndOfStream);
                    }
                    debug!(topic = %self.topic, partition, "Partition drained");
                }
                Err(e) => return Err(transport_error(e)),
            }
        };

        self.drained.mark_active(msg.partition());

        debug!(
            topic = %self.topic,
            partition = msg.partition(),
            offset = msg.offset(),
            "Received CDC message"
        );

        match decode_record(msg.key(), msg.payload())? {
            DecodedRecord::Update(update) => Ok(Some(update)),
            DecodedRecord::Tombstone { product_id } => {
                debug!(
                    product_id = ?product_id,
                    offset = msg.offset(),
                    "Received tombstone record"
                );
                Ok(None)
            }
        }
    }
}
