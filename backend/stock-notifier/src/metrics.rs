use actix_web::HttpResponse;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::warn;

use crate::models::{NotificationKind, UpdateClassification};

/// Counters for notifier throughput and per-record failures
#[derive(Clone)]
pub struct NotifierMetrics {
    /// Updates read from the source, tombstones included
    pub updates_total: IntCounter,
    /// Notifications delivered to the sink, by type
    pub notifications_total: IntCounterVec,
    /// Updates that produced no notification, by classification
    pub ignored_total: IntCounterVec,
    /// Failed reads, by error kind
    pub source_errors_total: IntCounterVec,
    /// Failed notification writes
    pub sink_errors_total: IntCounter,
}

impl NotifierMetrics {
    /// Metrics registered in the process-wide default registry
    pub fn new() -> Self {
        Self::with_registry(prometheus::default_registry())
    }

    pub fn with_registry(registry: &Registry) -> Self {
        let updates_total = IntCounter::new(
            "stock_notifier_updates_total",
            "Total number of CDC updates read, including tombstones",
        )
        .expect("valid metric for stock_notifier_updates_total");

        let notifications_total = IntCounterVec::new(
            Opts::new(
                "stock_notifier_notifications_total",
                "Total number of stock notifications published",
            ),
            &["type"],
        )
        .expect("valid metric for stock_notifier_notifications_total");

        let ignored_total = IntCounterVec::new(
            Opts::new(
                "stock_notifier_ignored_total",
                "Total number of updates that did not produce a notification",
            ),
            &["classification"],
        )
        .expect("valid metric for stock_notifier_ignored_total");

        let source_errors_total = IntCounterVec::new(
            Opts::new(
                "stock_notifier_source_errors_total",
                "Total number of errors reading CDC updates",
            ),
            &["kind"],
        )
        .expect("valid metric for stock_notifier_source_errors_total");

        let sink_errors_total = IntCounter::new(
            "stock_notifier_sink_errors_total",
            "Total number of errors publishing notifications",
        )
        .expect("valid metric for stock_notifier_sink_errors_total");

        for metric in [
            Box::new(updates_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(notifications_total.clone()),
            Box::new(ignored_total.clone()),
            Box::new(source_errors_total.clone()),
            Box::new(sink_errors_total.clone()),
        ] {
            if let Err(e) = registry.register(metric) {
                warn!("Failed to register stock notifier metric: {}", e);
            }
        }

        Self {
            updates_total,
            notifications_total,
            ignored_total,
            source_errors_total,
            sink_errors_total,
        }
    }

    pub fn record_notification(&self, kind: NotificationKind) {
        self.notifications_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    pub fn record_ignored(&self, classification: UpdateClassification) {
        self.ignored_total
            .with_label_values(&[classification.as_str()])
            .inc();
    }

    pub fn record_source_error(&self, kind: &str) {
        self.source_errors_total.with_label_values(&[kind]).inc();
    }
}

impl Default for NotifierMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a registry in the Prometheus text exposition format
pub fn render(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;

    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// `GET /metrics` for the default registry
pub async fn serve_metrics() -> HttpResponse {
    match render(prometheus::default_registry()) {
        Ok(body) => HttpResponse::Ok()
            .content_type(TextEncoder::new().format_type())
            .body(body),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}
