//! Stock notifier: derives "back in stock" / "out of stock" events from
//! Debezium CDC records of the `products_on_hand` table.

pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod services;
pub mod shutdown;

pub use config::Config;
pub use error::{AppError, DecodeError, NotifierError, Result, SinkError, SourceError};
pub use models::{Notification, NotificationKind, Update, UpdateClassification};
pub use services::{NotificationSink, Notifier, UpdateSource};
pub use shutdown::{Shutdown, ShutdownTrigger};
