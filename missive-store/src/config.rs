use std::{path::PathBuf, sync::Arc};

use serde::Deserialize;

use crate::{FileRecordStore, MemoryRecordStore, r#trait::RecordStore};

/// Configuration for the record store
///
/// File-backed store in RON config:
/// ```ron
/// Missive (
///     store: File(
///         path: "/var/lib/missive",
///     ),
/// )
/// ```
///
/// Memory-backed store, optionally bounded:
/// ```ron
/// Missive (
///     store: Memory(
///         capacity: Some(1000),
///     ),
/// )
/// ```
#[derive(Debug, Clone, Deserialize)]
pub enum StoreConfig {
    /// One file per record (production)
    File { path: PathBuf },
    /// In-memory records (testing/development)
    Memory {
        /// Maximum number of records to store (omit for unlimited)
        #[serde(default)]
        capacity: Option<usize>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory { capacity: None }
    }
}

impl StoreConfig {
    /// Filesystem path for file-backed stores
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::File { path } => Some(path),
            Self::Memory { .. } => None,
        }
    }

    /// Build and initialise the configured store
    ///
    /// # Errors
    /// Returns an error if a file store path is rejected or cannot be prepared.
    pub fn into_store(self) -> crate::Result<Arc<dyn RecordStore>> {
        Ok(match self {
            Self::File { path } => Arc::new(FileRecordStore::open(path)?),
            Self::Memory { capacity } => Arc::new(
                capacity.map_or_else(MemoryRecordStore::new, MemoryRecordStore::with_capacity),
            ),
        })
    }
}
