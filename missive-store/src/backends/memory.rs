use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    NotificationContent, NotificationId, NotificationRecord, NotificationStatus, StoreError,
    r#trait::{RecordStore, check_update},
};

/// In-memory record store
///
/// Records live in a `BTreeMap` keyed by identifier behind an `RwLock`, so
/// iteration is already in creation order. Intended for tests and
/// development; nothing survives a restart.
///
/// # Capacity Management
/// An optional capacity bounds the number of stored records. Once reached,
/// `create` fails until records are deleted.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<RwLock<BTreeMap<NotificationId, NotificationRecord>>>,
    /// Maximum number of records to store (None = unlimited)
    capacity: Option<usize>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Arc::default(),
            capacity: Some(capacity),
        }
    }

    /// Number of stored records
    ///
    /// Recovers gracefully if the lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Insert a record as-is, bypassing the pending-only constructor path
    ///
    /// Useful for seeding a store with records in arbitrary states.
    ///
    /// # Errors
    /// Returns an error if the lock is poisoned.
    pub fn insert(&self, record: NotificationRecord) -> crate::Result<()> {
        self.records.write()?.insert(record.id(), record);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, content: &NotificationContent) -> crate::Result<NotificationRecord> {
        let mut records = self.records.write()?;

        if let Some(capacity) = self.capacity
            && records.len() >= capacity
        {
            return Err(StoreError::CapacityExceeded {
                used: records.len(),
                capacity,
            });
        }

        let record =
            NotificationRecord::pending(NotificationId::generate(), content.clone(), Utc::now());
        records.insert(record.id(), record.clone());

        Ok(record)
    }

    async fn update(&self, record: &NotificationRecord) -> crate::Result<()> {
        let mut records = self.records.write()?;
        let stored = records
            .get_mut(&record.id())
            .ok_or(StoreError::NotFound(record.id()))?;

        check_update(stored, record)?;
        *stored = record.clone();

        Ok(())
    }

    async fn find(
        &self,
        content: &NotificationContent,
        status: NotificationStatus,
    ) -> crate::Result<Option<NotificationRecord>> {
        Ok(self
            .records
            .read()?
            .values()
            .find(|record| record.status() == status && record.matches(content))
            .cloned())
    }

    async fn list(
        &self,
        status: Option<NotificationStatus>,
    ) -> crate::Result<Vec<NotificationRecord>> {
        Ok(self
            .records
            .read()?
            .values()
            .rev()
            .filter(|record| status.is_none_or(|status| record.status() == status))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &NotificationId) -> crate::Result<Option<NotificationRecord>> {
        Ok(self.records.read()?.get(id).cloned())
    }

    async fn delete(&self, id: &NotificationId) -> crate::Result<bool> {
        Ok(self.records.write()?.remove(id).is_some())
    }

    async fn count(&self, status: Option<NotificationStatus>) -> crate::Result<usize> {
        let records = self.records.read()?;
        Ok(match status {
            None => records.len(),
            Some(status) => records.values().filter(|r| r.status() == status).count(),
        })
    }
}
