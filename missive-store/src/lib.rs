//! Persistent record keeping for notification delivery attempts
//!
//! A [`NotificationRecord`] is created `Pending` and transitions exactly once,
//! to `Sent` or `Failed`. Stores implement [`RecordStore`] and refuse to
//! overwrite a record that already reached a terminal state.

pub mod backends;
pub mod config;
pub mod error;
pub mod record;
pub mod r#trait;
pub mod types;

pub use backends::{FileRecordStore, FileRecordStoreBuilder, MemoryRecordStore};
pub use config::StoreConfig;
pub use error::{PathValidationError, Result, SerializationError, StoreError, TransitionError};
pub use record::{NotificationContent, NotificationRecord, NotificationStatus};
pub use r#trait::RecordStore;
pub use types::NotificationId;
