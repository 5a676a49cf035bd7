use std::sync::Arc;

use missive_store::{
    NotificationContent, NotificationRecord, NotificationStatus, RecordStore, StoreError,
};

/// Decides whether a send request repeats an earlier successful send
///
/// Only `Sent` records with byte-identical recipient, subject and message
/// count. When several match, the earliest (lowest identifier) is returned.
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    store: Arc<dyn RecordStore>,
}

impl DuplicateDetector {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Look up an already-sent record with this exact content
    ///
    /// # Errors
    /// Returns an error if the store cannot be queried.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn find_existing_sent(
        &self,
        content: &NotificationContent,
    ) -> Result<Option<NotificationRecord>, StoreError> {
        self.store.find(content, NotificationStatus::Sent).await
    }
}
