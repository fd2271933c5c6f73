//! Turns CDC updates into stock notifications.
//!
//! The notifier reads one update at a time, classifies it and forwards
//! back-in-stock / out-of-stock transitions to the sink. Each update is fully
//! handled, sink write included, before the next one is read.
//!
//! A failed read or write is logged and the loop moves on. A run ends in
//! exactly two ways:
//! - the source reports end of stream: `Ok(RunSummary)`
//! - shutdown is observed: `Err(NotifierError::Cancelled)`

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{NotificationSink, UpdateSource};
use crate::error::{NotifierError, SinkError, SourceError};
use crate::metrics::NotifierMetrics;
use crate::models::{Notification, NotificationKind, UpdateClassification};
use crate::shutdown::Shutdown;

/// What a single successful step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Notified(NotificationKind),
    Ignored(UpdateClassification),
}

/// Why a single step failed
#[derive(Debug, Error)]
pub enum StepError {
    #[error("error from source: {0}")]
    Source(#[from] SourceError),

    #[error("error from sink: {0}")]
    Sink(#[from] SinkError),
}

impl StepError {
    fn is_cancellation(&self) -> bool {
        matches!(
            self,
            StepError::Source(SourceError::Cancelled) | StepError::Sink(SinkError::Cancelled)
        )
    }
}

/// Counters for a run that reached end of stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Updates read and classified, tombstones included
    pub processed: u64,
    pub notified: u64,
    pub ignored: u64,
    pub source_errors: u64,
    pub sink_errors: u64,
}

pub struct Notifier<S: UpdateSource, K: NotificationSink> {
    source: Arc<S>,
    sink: Arc<K>,
    metrics: Option<NotifierMetrics>,
}

impl<S: UpdateSource, K: NotificationSink> Notifier<S, K> {
    pub fn new(source: Arc<S>, sink: Arc<K>) -> Self {
        Self {
            source,
            sink,
            metrics: None,
        }
    }

    /// Create a notifier that also updates Prometheus metrics on every step.
    pub fn new_with_metrics(source: Arc<S>, sink: Arc<K>, metrics: NotifierMetrics) -> Self {
        Self {
            source,
            sink,
            metrics: Some(metrics),
        }
    }

    /// Process updates until end of stream or shutdown.
    pub async fn run(&self, shutdown: &Shutdown) -> Result<RunSummary, NotifierError> {
        info!("Stock notifier starting");

        let mut summary = RunSummary::default();

        loop {
            if shutdown.is_cancelled() {
                info!(?summary, "Shutdown observed, stopping notifier");
                return Err(NotifierError::Cancelled);
            }

            match self.process_next_update(shutdown).await {
                Ok(StepOutcome::Notified(_)) => {
                    summary.processed += 1;
                    summary.notified += 1;
                }
                Ok(StepOutcome::Ignored(_)) => {
                    summary.processed += 1;
                    summary.ignored += 1;
                }
                Err(StepError::Source(SourceError::EndOfStream)) => {
                    info!(?summary, "Update stream ended, stopping notifier");
                    return Ok(summary);
                }
                Err(e) if e.is_cancellation() => {
                    info!(?summary, error = %e, "In-flight call cancelled, stopping notifier");
                    return Err(NotifierError::Cancelled);
                }
                Err(StepError::Source(e)) => {
                    summary.source_errors += 1;
                    if let SourceError::Decode(_) = e {
                        warn!(error = %e, "Skipping undecodable CDC record");
                    } else {
                        error!(error = %e, "Error reading stock update");
                    }
                }
                Err(StepError::Sink(e)) => {
                    // The update was read and classified before the write failed.
                    summary.processed += 1;
                    summary.sink_errors += 1;
                    error!(error = %e, "Error writing stock notification");
                }
            }
        }
    }

    /// Read, classify and (if interesting) forward a single update.
    pub async fn process_next_update(&self, shutdown: &Shutdown) -> Result<StepOutcome, StepError> {
        let update = match self.source.read_update(shutdown).await {
            Ok(update) => update,
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    if !matches!(e, SourceError::EndOfStream | SourceError::Cancelled) {
                        metrics.record_source_error(e.kind());
                    }
                }
                return Err(e.into());
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.updates_total.inc();
        }

        let classification = UpdateClassification::classify(update.as_ref());

        let notification = match update.as_ref().and_then(Notification::from_update) {
            Some(notification) => notification,
            None => {
                debug!(
                    product_id = ?update.map(|u| u.product_id),
                    classification = %classification,
                    "Ignored update"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_ignored(classification);
                }
                return Ok(StepOutcome::Ignored(classification));
            }
        };

        info!(
            product_id = notification.product_id,
            quantity = notification.quantity,
            notification_type = %notification.kind,
            "Stock transition detected"
        );

        if let Err(e) = self.sink.write_notification(shutdown, &notification).await {
            if let Some(metrics) = &self.metrics {
                if !matches!(e, SinkError::Cancelled) {
                    metrics.sink_errors_total.inc();
                }
            }
            return Err(e.into());
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_notification(notification.kind);
        }

        Ok(StepOutcome::Notified(notification.kind))
    }
}
