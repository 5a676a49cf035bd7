use std::{
    collections::{BTreeMap, HashMap},
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use missive_common::internal;
use tokio::{
    fs,
    sync::{Mutex, MutexGuard},
};

use crate::{
    NotificationContent, NotificationId, NotificationRecord, NotificationStatus,
    PathValidationError, StoreError,
    r#trait::{RecordStore, check_update},
};

/// File-based record store
///
/// Each record is stored as `{ULID}.bin`, bincode-encoded, in a single
/// directory. The ULID filename means a directory listing sorted by name is
/// also sorted by creation time.
///
/// # Atomicity
/// - Writes go to `.tmp_{ULID}.bin` and are renamed into place.
/// - Deletes rename to `{ULID}.bin.deleted` before removing.
/// - Leftovers of either are removed by [`init`](Self::init).
/// - A process-wide async mutex serializes operations on the directory, so
///   a read-check-write in `update` cannot interleave with another writer.
///
/// # Lookup
/// `find` is answered from an in-memory index of content to ids, built from the
/// directory on first access, so only the matching record file is read.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    path: PathBuf,
    index: Arc<Mutex<Option<ContentIndex>>>,
}

/// Record ids and statuses grouped by content, lowest id first
#[derive(Debug, Default)]
struct ContentIndex {
    entries: HashMap<NotificationContent, BTreeMap<NotificationId, NotificationStatus>>,
}

impl ContentIndex {
    fn from_records(records: &[NotificationRecord]) -> Self {
        let mut index = Self::default();
        for record in records {
            index.insert(record);
        }
        index
    }

    fn insert(&mut self, record: &NotificationRecord) {
        self.entries
            .entry(record.content())
            .or_default()
            .insert(record.id(), record.status());
    }

    fn remove(&mut self, content: &NotificationContent, id: &NotificationId) {
        if let Some(ids) = self.entries.get_mut(content) {
            ids.remove(id);
            if ids.is_empty() {
                self.entries.remove(content);
            }
        }
    }

    fn candidates(
        &self,
        content: &NotificationContent,
        status: NotificationStatus,
    ) -> Vec<NotificationId> {
        self.entries
            .get(content)
            .map(|ids| {
                ids.iter()
                    .filter(|(_, s)| **s == status)
                    .map(|(id, _)| *id)
                    .collect()
            })
            .unwrap_or_default()
    }
}

const TMP_PREFIX: &str = ".tmp_";
const DELETED_SUFFIX: &str = ".deleted";

fn bincode_config() -> bincode::config::Configuration {
    bincode::config::standard()
}

impl FileRecordStore {
    /// Validate a store path
    ///
    /// - Rejects paths containing `..`
    /// - Requires an absolute path
    /// - Rejects sensitive system directories
    ///
    /// # Errors
    /// Returns an error if the path is invalid or potentially dangerous
    pub fn validate_path(path: &Path) -> Result<(), PathValidationError> {
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(PathValidationError::ParentComponent(
                path.display().to_string(),
            ));
        }

        if !path.is_absolute() {
            return Err(PathValidationError::NotAbsolute(path.display().to_string()));
        }

        let sensitive_prefixes = [
            "/etc",
            "/bin",
            "/sbin",
            "/usr/bin",
            "/usr/sbin",
            "/boot",
            "/sys",
            "/proc",
            "/dev",
        ];

        for prefix in sensitive_prefixes {
            if path.starts_with(prefix) {
                return Err(PathValidationError::SystemDirectory {
                    prefix,
                    path: path.display().to_string(),
                });
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn builder() -> FileRecordStoreBuilder {
        FileRecordStoreBuilder::default()
    }

    /// Validate, prepare and open a store at `path`
    ///
    /// # Errors
    /// See [`FileRecordStoreBuilder::build`] and [`init`](Self::init).
    pub fn open(path: impl Into<PathBuf>) -> crate::Result<Self> {
        let mut store = Self::builder().path(path.into()).build()?;
        store.init()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Initialize the store directory
    ///
    /// Creates the directory if needed and removes orphaned temporary and
    /// deleted files left by a crash.
    ///
    /// # Errors
    /// - If the directory cannot be created or read
    /// - If the path exists but is not a directory
    pub fn init(&mut self) -> crate::Result<()> {
        internal!("Initialising record store at {} ...", self.path.display());

        if !self.path.try_exists()? {
            internal!("{} does not exist, creating...", self.path.display());
            std::fs::create_dir_all(&self.path)?;
        } else if !self.path.is_dir() {
            return Err(PathValidationError::NotDirectory(self.path.display().to_string()).into());
        }

        let mut cleaned = 0;
        for entry in std::fs::read_dir(&self.path)? {
            let entry = entry?;
            let filename = entry.file_name();
            let filename = filename.to_string_lossy();

            if filename.starts_with(TMP_PREFIX) || filename.ends_with(DELETED_SUFFIX) {
                std::fs::remove_file(entry.path())?;
                cleaned += 1;
            }
        }

        if cleaned > 0 {
            internal!(
                level = INFO,
                "Cleaned up {cleaned} orphaned files from record store"
            );
        }

        Ok(())
    }

    /// Lock the store, building the content index if this is the first access
    async fn lock_index(&self) -> crate::Result<IndexGuard<'_>> {
        let mut guard = self.index.lock().await;

        if guard.is_none() {
            let records = self.read_all().await?;
            internal!(
                level = DEBUG,
                "Indexed {} notifications in {}",
                records.len(),
                self.path.display()
            );
            *guard = Some(ContentIndex::from_records(&records));
        }

        Ok(IndexGuard { guard })
    }

    fn record_path(&self, id: &NotificationId) -> PathBuf {
        self.path.join(id.filename())
    }

    async fn write_record(&self, record: &NotificationRecord) -> crate::Result<()> {
        let filename = record.id().filename();
        let temp_path = self.path.join(format!("{TMP_PREFIX}{filename}"));

        let bytes = bincode::serde::encode_to_vec(record, bincode_config())?;
        fs::write(&temp_path, &bytes).await?;
        fs::rename(&temp_path, self.path.join(&filename)).await?;

        Ok(())
    }

    async fn read_record(&self, id: &NotificationId) -> crate::Result<Option<NotificationRecord>> {
        let bytes = match fs::read(self.record_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (record, _) = bincode::serde::decode_from_slice(&bytes, bincode_config())?;
        Ok(Some(record))
    }

    /// All records in creation order
    async fn read_all(&self) -> crate::Result<Vec<NotificationRecord>> {
        let mut entries = fs::read_dir(&self.path).await?;
        let mut ids = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name();
            if let Some(id) = NotificationId::from_filename(&filename.to_string_lossy()) {
                ids.push(id);
            }
        }

        ids.sort();

        let mut records = Vec::with_capacity(ids.len());
        for id in &ids {
            // A concurrent delete from another process may remove a listed file
            if let Some(record) = self.read_record(id).await? {
                records.push(record);
            }
        }

        Ok(records)
    }
}

/// Exclusive access to the store directory and its loaded index
struct IndexGuard<'a> {
    guard: MutexGuard<'a, Option<ContentIndex>>,
}

impl IndexGuard<'_> {
    fn index(&mut self) -> &mut ContentIndex {
        self.guard.get_or_insert_with(ContentIndex::default)
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    #[tracing::instrument(level = "debug", skip_all)]
    async fn create(&self, content: &NotificationContent) -> crate::Result<NotificationRecord> {
        let mut guard = self.lock_index().await?;

        let id = NotificationId::generate();
        if fs::try_exists(self.record_path(&id)).await? {
            return Err(StoreError::Internal(format!(
                "ULID collision detected: {id}"
            )));
        }

        let record = NotificationRecord::pending(id, content.clone(), Utc::now());
        self.write_record(&record).await?;
        guard.index().insert(&record);

        internal!(level = DEBUG, "Stored notification {id} in {}", self.path.display());

        Ok(record)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(id = %record.id()))]
    async fn update(&self, record: &NotificationRecord) -> crate::Result<()> {
        let mut guard = self.lock_index().await?;

        let stored = self
            .read_record(&record.id())
            .await?
            .ok_or(StoreError::NotFound(record.id()))?;

        check_update(&stored, record)?;
        self.write_record(record).await?;
        guard.index().insert(record);

        Ok(())
    }

    async fn find(
        &self,
        content: &NotificationContent,
        status: NotificationStatus,
    ) -> crate::Result<Option<NotificationRecord>> {
        let mut guard = self.lock_index().await?;

        for id in guard.index().candidates(content, status) {
            match self.read_record(&id).await? {
                Some(record) if record.status() == status && record.matches(content) => {
                    return Ok(Some(record));
                }
                // Changed or removed by another process
                Some(record) => guard.index().insert(&record),
                None => guard.index().remove(content, &id),
            }
        }

        Ok(None)
    }

    async fn list(
        &self,
        status: Option<NotificationStatus>,
    ) -> crate::Result<Vec<NotificationRecord>> {
        let _guard = self.lock_index().await?;

        Ok(self
            .read_all()
            .await?
            .into_iter()
            .rev()
            .filter(|record| status.is_none_or(|status| record.status() == status))
            .collect())
    }

    async fn get(&self, id: &NotificationId) -> crate::Result<Option<NotificationRecord>> {
        let _guard = self.lock_index().await?;
        self.read_record(id).await
    }

    #[tracing::instrument(level = "debug", skip(self), fields(id = %id))]
    async fn delete(&self, id: &NotificationId) -> crate::Result<bool> {
        let mut guard = self.lock_index().await?;

        let Some(record) = self.read_record(id).await? else {
            return Ok(false);
        };

        let path = self.record_path(id);
        let deleted_path = self.path.join(format!("{}{DELETED_SUFFIX}", id.filename()));

        match fs::rename(&path, &deleted_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        guard.index().remove(&record.content(), id);

        // If this fails, init() removes the leftover on next start
        fs::remove_file(&deleted_path).await?;

        internal!(level = DEBUG, "Deleted notification {id} from record store");

        Ok(true)
    }
}

/// Builder for [`FileRecordStore`]
#[derive(Debug, Default)]
pub struct FileRecordStoreBuilder {
    path: PathBuf,
}

impl FileRecordStoreBuilder {
    #[must_use]
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Build the store without touching the filesystem
    ///
    /// # Errors
    /// Returns an error if the path is invalid or potentially dangerous
    pub fn build(self) -> Result<FileRecordStore, PathValidationError> {
        FileRecordStore::validate_path(&self.path)?;
        Ok(FileRecordStore {
            path: self.path,
            index: Arc::default(),
        })
    }
}
