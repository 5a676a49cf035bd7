//! Delivery orchestration
//!
//! [`NotificationService::send`] runs the whole workflow for one request,
//! strictly in order:
//!
//! 1. validate and normalise the request
//! 2. ask the [`DuplicateDetector`] for an already-sent record
//! 3. create a `Pending` record
//! 4. hand the message to the [`MailTransport`]
//! 5. persist the terminal `Sent` or `Failed` state
//!
//! Transport failures are captured in the returned [`SendOutcome`] and on the
//! persisted record. Only validation and store failures are returned as errors.
//!
//! Steps 2 to 5 run on their own task. A caller that stops waiting, such as an
//! HTTP request that times out, does not leave a record stuck in `Pending`.

use std::{sync::Arc, time::Instant};

use chrono::Utc;
use dashmap::DashMap;
use missive_common::{audit, internal, outgoing};
use missive_store::{
    NotificationContent, NotificationId, NotificationRecord, NotificationStatus, RecordStore,
    StoreError,
};
use serde::Deserialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::Instrument;

use crate::{
    DuplicateDetector, MailTransport, SendRequest, Statistics, error::Result,
};

/// Delivery behaviour settings
///
/// ```ron
/// Missive (
///     delivery: (
///         serialize_identical_sends: true,
///     ),
/// )
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryConfig {
    /// Serialize concurrent sends with identical content within this process
    ///
    /// When enabled, the second of two identical concurrent sends waits for
    /// the first to finish and is then intercepted as a duplicate if the first
    /// succeeded. Off by default: both sends may then be delivered.
    #[serde(default)]
    pub serialize_identical_sends: bool,
}

/// The result of one send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    /// Whether the notification is (now or previously) delivered
    pub success: bool,
    /// The new record, or the existing one for a duplicate
    pub record: NotificationRecord,
    /// The transport's failure description when `success` is false
    pub error: Option<String>,
}

/// Validates, de-duplicates, delivers and records notifications
#[derive(Debug, Clone)]
pub struct NotificationService {
    store: Arc<dyn RecordStore>,
    transport: Arc<dyn MailTransport>,
    detector: DuplicateDetector,
    locks: Option<Arc<ContentLocks>>,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        transport: Arc<dyn MailTransport>,
        config: &DeliveryConfig,
    ) -> Self {
        Self {
            detector: DuplicateDetector::new(Arc::clone(&store)),
            store,
            transport,
            locks: config
                .serialize_identical_sends
                .then(|| Arc::new(ContentLocks::default())),
        }
    }

    /// Send a notification unless identical content was already delivered
    ///
    /// # Errors
    /// - [`NotificationError::Validation`](crate::NotificationError::Validation)
    ///   if the input is rejected; no record is created.
    /// - [`NotificationError::Store`](crate::NotificationError::Store) if the
    ///   record store fails.
    /// - [`NotificationError::Task`](crate::NotificationError::Task) if the
    ///   delivery task panicked.
    pub async fn send(
        &self,
        recipient: &str,
        subject: &str,
        message: &str,
    ) -> Result<SendOutcome> {
        self.send_request(&SendRequest::new(recipient, subject, message))
            .await
    }

    /// [`send`](Self::send) for a request as received from a caller
    ///
    /// # Errors
    /// See [`send`](Self::send).
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn send_request(&self, request: &SendRequest) -> Result<SendOutcome> {
        let content = request.validate()?;

        let service = self.clone();
        tokio::spawn(async move { service.process(content).await }.in_current_span()).await?
    }

    /// Everything after validation, run on its own task by `send_request`
    async fn process(&self, content: NotificationContent) -> Result<SendOutcome> {
        let _permit = match &self.locks {
            Some(locks) => Some(locks.acquire(&content).await),
            None => None,
        };

        if let Some(existing) = self.detector.find_existing_sent(&content).await? {
            internal!(
                level = DEBUG,
                "Notification {} already sent, not sending again",
                existing.id()
            );
            audit::log_duplicate_suppressed(&existing.id().to_string(), existing.recipient());

            return Ok(SendOutcome {
                success: true,
                record: existing,
                error: None,
            });
        }

        let mut record = self.store.create(&content).await?;
        let id = record.id().to_string();
        audit::log_notification_created(&id, record.recipient(), record.subject().len());

        let started = Instant::now();
        let delivered = self
            .transport
            .deliver(&content.recipient, &content.subject, &content.message)
            .await;

        let outcome = match delivered {
            Ok(()) => {
                record.mark_sent(Utc::now())?;
                outgoing!(level = INFO, "Notification {id} sent to {}", record.recipient());
                audit::log_notification_sent(
                    &id,
                    record.recipient(),
                    started.elapsed().as_millis(),
                );

                SendOutcome {
                    success: true,
                    record,
                    error: None,
                }
            }
            Err(e) => {
                record.mark_failed(e.to_string())?;
                let description = record.error().map(str::to_string);
                outgoing!(
                    level = WARN,
                    "Failed to send notification {id} to {}: {e}",
                    record.recipient()
                );
                audit::log_notification_failed(
                    &id,
                    record.recipient(),
                    description.as_deref().unwrap_or_default(),
                );

                SendOutcome {
                    success: false,
                    record,
                    error: description,
                }
            }
        };

        match self.store.update(&outcome.record).await {
            Ok(()) => {}
            // Deleted while in flight: the delivery result still stands
            Err(StoreError::NotFound(id)) => internal!(
                level = WARN,
                "Notification {id} was deleted during delivery, final state not stored"
            ),
            Err(e) => return Err(e.into()),
        }

        Ok(outcome)
    }

    /// All records, newest first, optionally restricted to one status
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn list(&self, status: Option<NotificationStatus>) -> Result<Vec<NotificationRecord>> {
        Ok(self.store.list(status).await?)
    }

    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn get(&self, id: &NotificationId) -> Result<Option<NotificationRecord>> {
        Ok(self.store.get(id).await?)
    }

    /// Delete a record, returning whether it existed
    ///
    /// # Errors
    /// Returns an error if the store cannot be modified.
    pub async fn delete(&self, id: &NotificationId) -> Result<bool> {
        let deleted = self.store.delete(id).await?;
        if deleted {
            audit::log_notification_deleted(&id.to_string());
        }
        Ok(deleted)
    }

    /// Counts by status from a single listing of the store
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn statistics(&self) -> Result<Statistics> {
        let records = self.store.list(None).await?;
        Ok(Statistics::from_records(&records))
    }
}

/// Per-content async locks, removed once nobody holds or waits on them
#[derive(Debug, Default)]
struct ContentLocks {
    locks: DashMap<NotificationContent, Arc<Mutex<()>>>,
}

impl ContentLocks {
    async fn acquire(self: &Arc<Self>, content: &NotificationContent) -> ContentPermit {
        let lock = Arc::clone(self.locks.entry(content.clone()).or_default().value());
        let guard = lock.lock_owned().await;

        ContentPermit {
            guard: Some(guard),
            content: content.clone(),
            locks: Arc::clone(self),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}

struct ContentPermit {
    guard: Option<OwnedMutexGuard<()>>,
    content: NotificationContent,
    locks: Arc<ContentLocks>,
}

impl Drop for ContentPermit {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Waiters hold their own clone, so a count of one means only the map is left
        self.locks
            .locks
            .remove_if(&self.content, |_, lock| Arc::strong_count(lock) == 1);
    }
}
