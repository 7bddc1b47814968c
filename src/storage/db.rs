use redb::{Database as RedbDatabase, ReadTransaction, WriteTransaction};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use super::bucket::{Bucket, BucketOptions};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Database error: {0}")]
    RedbDatabase(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid bucket configuration: {0}")]
    InvalidBucket(String),
    #[error("Database connection is not ready")]
    NotReady,
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

impl From<redb::CommitError> for DatabaseError {
    fn from(e: redb::CommitError) -> Self {
        DatabaseError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for DatabaseError {
    fn from(e: redb::DatabaseError) -> Self {
        DatabaseError::RedbDatabase(Box::new(e))
    }
}

impl From<redb::Error> for DatabaseError {
    fn from(e: redb::Error) -> Self {
        DatabaseError::Redb(Box::new(e))
    }
}

impl From<redb::StorageError> for DatabaseError {
    fn from(e: redb::StorageError) -> Self {
        DatabaseError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for DatabaseError {
    fn from(e: redb::TableError) -> Self {
        DatabaseError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for DatabaseError {
    fn from(e: redb::TransactionError) -> Self {
        DatabaseError::Transaction(Box::new(e))
    }
}

/// Connection handle to the embedded document database.
///
/// Clones share the underlying redb instance and the ready-state flag.
#[derive(Clone)]
pub struct Database {
    db: Arc<RedbDatabase>,
    ready: Arc<AtomicBool>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("file-store.redb");
        let db = Arc::new(RedbDatabase::create(db_path)?);

        Ok(Self {
            db,
            ready: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Whether the connection accepts operations.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Mark the connection unavailable. Buckets created from it start failing.
    pub fn disconnect(&self) {
        if self.ready.swap(false, Ordering::AcqRel) {
            tracing::warn!("Database connection marked as disconnected");
        }
    }

    /// Cheap liveness probe used by the repository health check.
    pub fn ping(&self) -> Result<(), DatabaseError> {
        self.begin_read()?;
        Ok(())
    }

    /// Create (or reopen) a named bucket and its tables.
    pub fn bucket(&self, name: &str, options: BucketOptions) -> Result<Bucket, DatabaseError> {
        if name.is_empty() || name.contains('/') {
            return Err(DatabaseError::InvalidBucket(format!(
                "bucket name '{name}' must be non-empty and contain no '/'"
            )));
        }
        if options.chunk_size == 0 {
            return Err(DatabaseError::InvalidBucket(
                "chunk size must be greater than 0".to_string(),
            ));
        }

        let bucket = Bucket::new(self.clone(), name, options);
        bucket.create_tables()?;
        tracing::debug!(bucket = %name, chunk_size = options.chunk_size, "Bucket initialized");
        Ok(bucket)
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        if !self.is_ready() {
            return Err(DatabaseError::NotReady);
        }
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        if !self.is_ready() {
            return Err(DatabaseError::NotReady);
        }
        Ok(self.db.begin_write()?)
    }
}
