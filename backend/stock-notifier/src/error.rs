//! Error types for the stock notifier.
//!
//! Per-record errors (`DecodeError`, `SourceError`, `SinkError`) are contained
//! by the notifier loop. Only `NotifierError` escapes a run.

use thiserror::Error;

use crate::models::ProductId;

pub type Result<T> = std::result::Result<T, AppError>;

/// A CDC record that could not be turned into an `Update`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is empty")]
    EmptyPayload,

    #[error("product ids do not match (before={before}, after={after})")]
    ProductIdMismatch { before: ProductId, after: ProductId },

    #[error("record key product id {key} does not match payload product id {payload}")]
    KeyMismatch { key: ProductId, payload: ProductId },

    #[error("invalid CDC message format: {0}")]
    InvalidFormat(#[from] serde_json::Error),
}

/// Errors returned by an `UpdateSource`.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The upstream has no more records. Ends a run cleanly.
    #[error("end of stream")]
    EndOfStream,

    /// The read observed shutdown before a record arrived.
    #[error("read cancelled")]
    Cancelled,

    #[error("invalid message: {0}")]
    Decode(#[from] DecodeError),

    #[error("source transport error: {0}")]
    Transport(String),
}

impl SourceError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::EndOfStream => "end_of_stream",
            SourceError::Cancelled => "cancelled",
            SourceError::Decode(_) => "decode",
            SourceError::Transport(_) => "transport",
        }
    }
}

/// Errors returned by a `NotificationSink`.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The write observed shutdown before delivery was confirmed.
    #[error("write cancelled")]
    Cancelled,

    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("sink transport error: {0}")]
    Transport(String),
}

/// Terminal result of a notifier run that did not end at end-of-stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifierError {
    #[error("notifier cancelled")]
    Cancelled,
}

/// Service-level errors raised while wiring the process together.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}
