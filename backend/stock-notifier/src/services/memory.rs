//! In-memory source and sink for driving a notifier without a broker.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{NotificationSink, UpdateSource};
use crate::error::{SinkError, SourceError};
use crate::models::{Notification, Update};
use crate::shutdown::Shutdown;

enum Scripted {
    Update(Update),
    Tombstone,
    Error(SourceError),
}

/// Replays a fixed script of updates, tombstones and errors, then reports
/// end of stream.
#[derive(Default)]
pub struct InMemoryUpdateSource {
    queue: Mutex<VecDeque<Scripted>>,
    reads: AtomicUsize,
}

impl InMemoryUpdateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_updates(updates: impl IntoIterator<Item = Update>) -> Self {
        let source = Self::new();
        for update in updates {
            source.push_update(update);
        }
        source
    }

    pub fn push_update(&self, update: Update) {
        self.push(Scripted::Update(update));
    }

    pub fn push_tombstone(&self) {
        self.push(Scripted::Tombstone);
    }

    pub fn push_error(&self, error: SourceError) {
        self.push(Scripted::Error(error));
    }

    /// Number of `read_update` calls served, end-of-stream included
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    fn push(&self, item: Scripted) {
        self.lock().push_back(item);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Scripted>> {
        // A poisoned queue still holds a usable script.
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl UpdateSource for InMemoryUpdateSource {
    async fn read_update(&self, shutdown: &Shutdown) -> Result<Option<Update>, SourceError> {
        if shutdown.is_cancelled() {
            return Err(SourceError::Cancelled);
        }

        self.reads.fetch_add(1, Ordering::SeqCst);

        match self.lock().pop_front() {
            Some(Scripted::Update(update)) => Ok(Some(update)),
            Some(Scripted::Tombstone) => Ok(None),
            Some(Scripted::Error(e)) => Err(e),
            None => Err(SourceError::EndOfStream),
        }
    }
}

/// Records every delivered notification. Can be primed to fail writes.
#[derive(Default)]
pub struct InMemoryNotificationSink {
    written: Mutex<Vec<Notification>>,
    failures_remaining: AtomicUsize,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` writes with a transport error
    pub fn fail_next(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    pub fn written(&self) -> Vec<Notification> {
        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn write_notification(
        &self,
        shutdown: &Shutdown,
        notification: &Notification,
    ) -> Result<(), SinkError> {
        if shutdown.is_cancelled() {
            return Err(SinkError::Cancelled);
        }

        let failed = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(SinkError::Transport("injected write failure".to_string()));
        }

        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(*notification);
        Ok(())
    }
}
