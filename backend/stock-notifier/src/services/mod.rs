pub mod cdc;
pub mod memory;
pub mod notification_producer;
pub mod notifier;

pub use cdc::{KafkaSourceConfig, KafkaUpdateSource};
pub use memory::{InMemoryNotificationSink, InMemoryUpdateSource};
pub use notification_producer::{encode_notification, KafkaNotificationSink, KafkaSinkConfig};
pub use notifier::{Notifier, RunSummary, StepError, StepOutcome};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{SinkError, SourceError};
use crate::models::{Notification, Update};
use crate::shutdown::Shutdown;

/// Supplies CDC updates one at a time.
///
/// `Ok(None)` is a tombstone. `SourceError::EndOfStream` is the only error
/// that ends a notifier run without failure.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Read the next update. Implementations should return
    /// `SourceError::Cancelled` promptly once `shutdown` fires.
    async fn read_update(&self, shutdown: &Shutdown) -> Result<Option<Update>, SourceError>;
}

/// Accepts stock notifications for delivery.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn write_notification(
        &self,
        shutdown: &Shutdown,
        notification: &Notification,
    ) -> Result<(), SinkError>;
}

#[async_trait]
impl<T: UpdateSource + ?Sized> UpdateSource for Arc<T> {
    async fn read_update(&self, shutdown: &Shutdown) -> Result<Option<Update>, SourceError> {
        (**self).read_update(shutdown).await
    }
}

#[async_trait]
impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    async fn write_notification(
        &self,
        shutdown: &Shutdown,
        notification: &Notification,
    ) -> Result<(), SinkError> {
        (**self).write_notification(shutdown, notification).await
    }
}
