use async_trait::async_trait;

use crate::{
    NotificationContent, NotificationId, NotificationRecord, NotificationStatus, StoreError,
};

/// Storage for notification records
///
/// Implementations are shared between request handlers, so every operation
/// must be atomic with respect to the others on the same store.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Create a new `Pending` record with a fresh identifier and creation time
    async fn create(&self, content: &NotificationContent) -> crate::Result<NotificationRecord>;

    /// Persist a record's terminal transition
    ///
    /// Fails with [`StoreError::NotFound`] for unknown records and with
    /// [`StoreError::AlreadyFinalised`] if the stored copy is no longer pending.
    async fn update(&self, record: &NotificationRecord) -> crate::Result<()>;

    /// Find a record with exactly this content and status
    ///
    /// When several match, the one with the lowest identifier is returned.
    async fn find(
        &self,
        content: &NotificationContent,
        status: NotificationStatus,
    ) -> crate::Result<Option<NotificationRecord>>;

    /// List records, newest first, optionally restricted to one status
    async fn list(&self, status: Option<NotificationStatus>)
    -> crate::Result<Vec<NotificationRecord>>;

    async fn get(&self, id: &NotificationId) -> crate::Result<Option<NotificationRecord>>;

    /// Delete a record, returning whether anything was removed
    async fn delete(&self, id: &NotificationId) -> crate::Result<bool>;

    async fn count(&self, status: Option<NotificationStatus>) -> crate::Result<usize> {
        Ok(self.list(status).await?.len())
    }
}

/// Check that `updated` is a legal replacement for `stored`
///
/// # Errors
///
/// Returns an error if `stored` is terminal or `updated` changes a field that is
/// fixed at creation.
pub fn check_update(stored: &NotificationRecord, updated: &NotificationRecord) -> crate::Result<()> {
    let id = stored.id();

    if stored.status().is_terminal() {
        return Err(StoreError::AlreadyFinalised(id));
    }

    if stored.created_at() != updated.created_at() {
        return Err(StoreError::ImmutableField {
            id,
            field: "created_at",
        });
    }

    if !updated.matches(&stored.content()) {
        return Err(StoreError::ImmutableField {
            id,
            field: "content",
        });
    }

    Ok(())
}
