//! Large-object file store addressed by opaque locators.
//!
//! Objects go to a chunked [`Bucket`] in the database, or to a process-local
//! [`MemoryStore`] in test mode and whenever the bucket is unavailable. Reads
//! always check memory first, so an object is served by whichever side
//! wrote it.

mod locator;
mod memory;

pub use locator::{FileLocator, LocatorError, LOCATOR_SCHEME};
pub use memory::MemoryStore;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::storage::models::{FileRecord, UploadOptions};
use crate::storage::{
    Bucket, BucketError, BucketOptions, Database, ObjectId, DEFAULT_CHUNK_SIZE,
};

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Storage backend unavailable for bucket {0}")]
    BackendUnavailable(String),
    #[error("{operation} failed: {source}")]
    BackendIo {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<LocatorError> for FileStoreError {
    fn from(e: LocatorError) -> Self {
        FileStoreError::InvalidLocator(e.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Point-in-time status of the store.
#[derive(Debug, Clone, Serialize)]
pub struct FileStoreHealth {
    pub status: HealthStatus,
    pub bucket_name: String,
    pub connected: bool,
}

#[derive(Debug, Clone)]
pub struct FileStoreSettings {
    pub bucket_name: String,
    pub chunk_size: u32,
    /// Route every write to the in-memory store.
    pub test_mode: bool,
}

impl Default for FileStoreSettings {
    fn default() -> Self {
        Self {
            bucket_name: "resume-files".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            test_mode: false,
        }
    }
}

impl From<&Config> for FileStoreSettings {
    fn from(config: &Config) -> Self {
        Self {
            bucket_name: config.storage.bucket_name.clone(),
            chunk_size: config.storage.chunk_size,
            test_mode: config.test_mode,
        }
    }
}

/// Where a single call is served from.
enum Backend<'a> {
    Memory { store: &'a MemoryStore, token: &'a str },
    Persistent { bucket: Bucket, id: ObjectId },
}

impl Backend<'_> {
    async fn download(self, locator: &FileLocator) -> Result<Bytes, FileStoreError> {
        match self {
            Backend::Memory { store, token } => store
                .data(token)
                .ok_or_else(|| FileStoreError::NotFound(locator.to_string())),
            Backend::Persistent { bucket, id } => {
                run_blocking("download", bucket, move |b| b.download(&id)).await
            }
        }
    }

    async fn info(self, locator: &FileLocator) -> Result<FileRecord, FileStoreError> {
        match self {
            Backend::Memory { store, token } => store
                .record(token)
                .ok_or_else(|| FileStoreError::NotFound(locator.to_string())),
            Backend::Persistent { bucket, id } => {
                run_blocking("info", bucket, move |b| {
                    b.find(&id)?.ok_or(BucketError::FileNotFound(id))
                })
                .await
            }
        }
    }

    async fn delete(self) -> Result<bool, FileStoreError> {
        match self {
            Backend::Memory { store, token } => Ok(store.remove(token)),
            Backend::Persistent { bucket, id } => {
                run_blocking("delete", bucket, move |b| b.delete(&id)).await
            }
        }
    }
}

/// Run a bucket call on the blocking pool and translate its error.
async fn run_blocking<T, F>(
    operation: &'static str,
    bucket: Bucket,
    f: F,
) -> Result<T, FileStoreError>
where
    F: FnOnce(&Bucket) -> Result<T, BucketError> + Send + 'static,
    T: Send + 'static,
{
    let name = bucket.name().to_string();
    let result = tokio::task::spawn_blocking(move || f(&bucket))
        .await
        .map_err(|e| FileStoreError::BackendIo {
            operation,
            source: Box::new(e),
        })?;

    result.map_err(|e| match e {
        BucketError::FileNotFound(id) => {
            FileStoreError::NotFound(FileLocator::new(name, id.to_hex()).to_string())
        }
        BucketError::Disconnected => FileStoreError::BackendUnavailable(name),
        other => FileStoreError::BackendIo {
            operation,
            source: Box::new(other),
        },
    })
}

/// The file store. Share it behind an `Arc`; every method takes `&self`.
pub struct FileStore {
    bucket_name: String,
    chunk_size: u32,
    test_mode: bool,
    connection: Option<Database>,
    bucket: Option<Bucket>,
    memory: MemoryStore,
}

impl FileStore {
    /// Build a store, initializing the bucket if a ready connection is given.
    ///
    /// Bucket initialization failures are logged and leave the store running
    /// on the in-memory fallback.
    pub fn new(settings: FileStoreSettings, connection: Option<Database>) -> Self {
        let bucket = match &connection {
            _ if settings.test_mode => {
                tracing::info!(
                    bucket = %settings.bucket_name,
                    "Test mode: using in-memory file store"
                );
                None
            }
            Some(db) if db.is_ready() => {
                let options = BucketOptions {
                    chunk_size: settings.chunk_size,
                };
                match db.bucket(&settings.bucket_name, options) {
                    Ok(bucket) => Some(bucket),
                    Err(e) => {
                        tracing::error!(
                            bucket = %settings.bucket_name,
                            error = %e,
                            "Failed to initialize bucket, falling back to in-memory store"
                        );
                        None
                    }
                }
            }
            Some(_) => {
                tracing::warn!(
                    bucket = %settings.bucket_name,
                    "Database connection not ready, falling back to in-memory store"
                );
                None
            }
            None => {
                tracing::warn!(
                    bucket = %settings.bucket_name,
                    "No database connection, falling back to in-memory store"
                );
                None
            }
        };

        Self {
            bucket_name: settings.bucket_name,
            chunk_size: settings.chunk_size,
            test_mode: settings.test_mode,
            connection,
            bucket,
            memory: MemoryStore::new(),
        }
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn locator_for(&self, id: &ObjectId) -> FileLocator {
        FileLocator::new(&self.bucket_name, id.to_hex())
    }

    /// The bucket, if it is initialized and its connection is ready.
    fn live_bucket(&self) -> Option<&Bucket> {
        self.bucket.as_ref().filter(|b| b.is_connected())
    }

    fn parse_locator(&self, raw: &str) -> Result<FileLocator, FileStoreError> {
        let locator = FileLocator::parse(raw)?;
        if locator.bucket() != self.bucket_name {
            return Err(FileStoreError::InvalidLocator(format!(
                "{raw} does not belong to bucket {}",
                self.bucket_name
            )));
        }
        Ok(locator)
    }

    /// Pick the backend that serves `locator`: memory first, then the bucket.
    fn resolve_backend<'a>(
        &'a self,
        locator: &'a FileLocator,
    ) -> Result<Backend<'a>, FileStoreError> {
        let token = locator.object_id();
        if self.memory.contains(token) {
            return Ok(Backend::Memory {
                store: &self.memory,
                token,
            });
        }

        // Every token this store mints is an ObjectId, whichever side holds it
        let id = ObjectId::parse_str(token)
            .map_err(|e| FileStoreError::InvalidLocator(format!("{locator}: {e}")))?;

        if self.test_mode {
            return Err(FileStoreError::NotFound(locator.to_string()));
        }

        let bucket = self
            .live_bucket()
            .ok_or_else(|| FileStoreError::BackendUnavailable(self.bucket_name.clone()))?;

        Ok(Backend::Persistent {
            bucket: bucket.clone(),
            id,
        })
    }

    /// Store `data` and return a locator for it.
    pub async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        options: UploadOptions,
    ) -> Result<FileLocator, FileStoreError> {
        let (locator, _) = self.upload_with_record(data, filename, options).await?;
        Ok(locator)
    }

    /// Like [`FileStore::upload`], also returning the stored file document.
    pub async fn upload_with_record(
        &self,
        data: Bytes,
        filename: &str,
        options: UploadOptions,
    ) -> Result<(FileLocator, FileRecord), FileStoreError> {
        if data.is_empty() {
            return Err(FileStoreError::InvalidArgument(
                "file buffer must not be empty".to_string(),
            ));
        }
        if filename.trim().is_empty() {
            return Err(FileStoreError::InvalidArgument(
                "filename must not be empty".to_string(),
            ));
        }

        let bucket = if self.test_mode {
            None
        } else {
            self.live_bucket()
        };

        let record = match bucket {
            Some(bucket) => {
                let filename = filename.to_string();
                run_blocking("upload", bucket.clone(), move |b| {
                    b.upload_from_bytes(&filename, &data, &options)
                })
                .await?
            }
            None => {
                if !self.test_mode {
                    tracing::debug!(
                        bucket = %self.bucket_name,
                        "Bucket unavailable, storing upload in memory"
                    );
                }
                self.memory
                    .insert(filename, &data, &options, self.chunk_size)
            }
        };

        let locator = self.locator_for(&record.id);
        tracing::info!(
            locator = %locator,
            filename = %record.filename,
            length = record.length,
            "Uploaded file"
        );
        Ok((locator, record))
    }

    /// Fetch the exact bytes previously uploaded.
    pub async fn download(&self, locator: &str) -> Result<Bytes, FileStoreError> {
        let locator = self.parse_locator(locator)?;
        let data = self.resolve_backend(&locator)?.download(&locator).await?;
        tracing::debug!(locator = %locator, length = data.len(), "Downloaded file");
        Ok(data)
    }

    /// File document only; the blob is not read.
    pub async fn info(&self, locator: &str) -> Result<FileRecord, FileStoreError> {
        let locator = self.parse_locator(locator)?;
        self.resolve_backend(&locator)?.info(&locator).await
    }

    /// `false` for a well-formed locator with nothing behind it, including a
    /// memory miss while no bucket is available. Malformed locators fail with
    /// `InvalidLocator` like every other operation.
    pub async fn exists(&self, locator: &str) -> Result<bool, FileStoreError> {
        let locator = self.parse_locator(locator)?;
        let backend = match self.resolve_backend(&locator) {
            Ok(backend) => backend,
            Err(FileStoreError::NotFound(_) | FileStoreError::BackendUnavailable(_)) => {
                return Ok(false)
            }
            Err(e) => return Err(e),
        };

        match backend.info(&locator).await {
            Ok(_) => Ok(true),
            Err(FileStoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove an object. Deleting something that is not there is not an error,
    /// and neither is a memory miss while no bucket is available.
    pub async fn delete(&self, locator: &str) -> Result<(), FileStoreError> {
        let locator = self.parse_locator(locator)?;
        let deleted = match self.resolve_backend(&locator) {
            Ok(backend) => backend.delete().await?,
            Err(FileStoreError::NotFound(_) | FileStoreError::BackendUnavailable(_)) => false,
            Err(e) => return Err(e),
        };

        if deleted {
            tracing::info!(locator = %locator, "Deleted file");
        } else {
            tracing::warn!(locator = %locator, "Delete requested for missing file");
        }
        Ok(())
    }

    /// Every known record with its locator: memory first, then the bucket.
    pub async fn list(&self) -> Result<Vec<(FileLocator, FileRecord)>, FileStoreError> {
        let mut records = self.memory.records();

        if let Some(bucket) = self.live_bucket() {
            records.extend(run_blocking("list", bucket.clone(), |b| b.list()).await?);
        }

        Ok(records
            .into_iter()
            .map(|record| (self.locator_for(&record.id), record))
            .collect())
    }

    pub fn health_check(&self) -> FileStoreHealth {
        let connected =
            self.connection.as_ref().is_some_and(Database::is_ready) && self.bucket.is_some();
        let status = if connected || self.test_mode {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        FileStoreHealth {
            status,
            bucket_name: self.bucket_name.clone(),
            connected,
        }
    }
}
