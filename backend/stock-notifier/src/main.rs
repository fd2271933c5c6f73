use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;
use stock_notifier::metrics::{self, NotifierMetrics};
use stock_notifier::services::{KafkaNotificationSink, KafkaUpdateSource};
use stock_notifier::{Config, NotifierError, Notifier, Shutdown};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,stock_notifier=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting stock-notifier");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        env = %config.app.env,
        brokers = %config.source.brokers,
        cdc_topic = %config.source.topic,
        notification_topic = %config.sink.topic,
        "Configuration loaded"
    );

    let source = Arc::new(
        KafkaUpdateSource::new(&config.source).context("Failed to create CDC update source")?,
    );
    let sink = Arc::new(
        KafkaNotificationSink::new(&config.sink).context("Failed to create notification sink")?,
    );

    let metrics_server = match config.app.metrics_port {
        Some(port) => {
            let server = HttpServer::new(|| {
                App::new()
                    .route("/metrics", web::get().to(metrics::serve_metrics))
                    .route("/health", web::get().to(metrics::health))
            })
            .workers(1)
            .disable_signals()
            .bind(("0.0.0.0", port))
            .with_context(|| format!("Failed to bind metrics server on port {}", port))?
            .run();

            let handle = server.handle();
            actix_web::rt::spawn(server);
            info!(port, "Metrics server listening");
            Some(handle)
        }
        None => None,
    };

    let (trigger, shutdown) = Shutdown::channel();
    actix_web::rt::spawn(async move {
        shutdown_signal().await;
        info!("Gracefully shutting down...");
        trigger.trigger();
    });

    let notifier = Notifier::new_with_metrics(source, sink, NotifierMetrics::new());
    match notifier.run(&shutdown).await {
        Ok(summary) => info!(
            processed = summary.processed,
            notified = summary.notified,
            ignored = summary.ignored,
            source_errors = summary.source_errors,
            sink_errors = summary.sink_errors,
            "CDC stream ended"
        ),
        Err(NotifierError::Cancelled) => info!("Notifier stopped by shutdown signal"),
    }

    if let Some(handle) = metrics_server {
        handle.stop(true).await;
    }

    info!("Done!");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
