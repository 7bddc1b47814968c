use bytes::{Bytes, BytesMut};
use chrono::Utc;
use redb::{ReadableTable, TableDefinition};
use thiserror::Error;

use super::db::{Database, DatabaseError};
use super::models::{FileRecord, UploadOptions};
use super::object_id::ObjectId;
use super::tables::*;

/// 255 KiB, just under the 256 KiB page boundary.
pub const DEFAULT_CHUNK_SIZE: u32 = 255 * 1024;

#[derive(Debug, Error)]
pub enum BucketError {
    #[error("File not found: {0}")]
    FileNotFound(ObjectId),
    #[error("File {id} is corrupt: {reason}")]
    CorruptFile { id: ObjectId, reason: String },
    #[error("Database connection is not ready")]
    Disconnected,
    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for BucketError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotReady => BucketError::Disconnected,
            other => BucketError::Database(other),
        }
    }
}

impl From<redb::CommitError> for BucketError {
    fn from(e: redb::CommitError) -> Self {
        DatabaseError::from(e).into()
    }
}

impl From<redb::StorageError> for BucketError {
    fn from(e: redb::StorageError) -> Self {
        DatabaseError::from(e).into()
    }
}

impl From<redb::TableError> for BucketError {
    fn from(e: redb::TableError) -> Self {
        DatabaseError::from(e).into()
    }
}

impl From<rmp_serde::decode::Error> for BucketError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        DatabaseError::from(e).into()
    }
}

impl From<rmp_serde::encode::Error> for BucketError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        DatabaseError::from(e).into()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BucketOptions {
    pub chunk_size: u32,
}

impl Default for BucketOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// A named partition of the database holding chunked large objects.
///
/// Each object is one file document plus `ceil(length / chunk_size)` chunks
/// keyed by `(id, n)`. Uploads write both in a single transaction, so a
/// record is never visible without its chunks.
#[derive(Clone)]
pub struct Bucket {
    db: Database,
    name: String,
    files_table: String,
    chunks_table: String,
    chunk_size: u32,
}

impl Bucket {
    pub(super) fn new(db: Database, name: &str, options: BucketOptions) -> Self {
        Self {
            db,
            name: name.to_string(),
            files_table: files_table_name(name),
            chunks_table: chunks_table_name(name),
            chunk_size: options.chunk_size,
        }
    }

    pub(super) fn create_tables(&self) -> Result<(), DatabaseError> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(self.files_def())?;
            let _ = write_txn.open_table(self.chunks_def())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn files_def(&self) -> FilesTable<'_> {
        TableDefinition::new(&self.files_table)
    }

    fn chunks_def(&self) -> ChunksTable<'_> {
        TableDefinition::new(&self.chunks_table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the underlying connection is ready.
    pub fn is_connected(&self) -> bool {
        self.db.is_ready()
    }

    /// Store `data` as a new object and return its file document.
    pub fn upload_from_bytes(
        &self,
        filename: &str,
        data: &[u8],
        options: &UploadOptions,
    ) -> Result<FileRecord, BucketError> {
        let id = ObjectId::new();
        let key = id.to_hex();
        let record = FileRecord {
            id,
            filename: filename.to_string(),
            content_type: options.content_type_or_default(),
            length: data.len() as u64,
            chunk_size: self.chunk_size,
            upload_date: Utc::now(),
            metadata: options.metadata.clone(),
        };

        let write_txn = self.db.begin_write()?;
        {
            let mut chunks = write_txn.open_table(self.chunks_def())?;
            for (n, chunk) in data.chunks(self.chunk_size as usize).enumerate() {
                chunks.insert((key.as_str(), n as u32), chunk)?;
            }

            let mut files = write_txn.open_table(self.files_def())?;
            let encoded = rmp_serde::to_vec_named(&record)?;
            files.insert(key.as_str(), encoded.as_slice())?;
        }
        write_txn.commit()?;

        tracing::debug!(
            bucket = %self.name,
            file_id = %id,
            length = record.length,
            chunks = record.chunk_count(),
            "Stored file"
        );
        Ok(record)
    }

    /// Get a file document without touching its chunks.
    pub fn find(&self, id: &ObjectId) -> Result<Option<FileRecord>, BucketError> {
        let read_txn = self.db.begin_read()?;
        let files = read_txn.open_table(self.files_def())?;

        match files.get(id.to_hex().as_str())? {
            Some(data) => Ok(Some(rmp_serde::from_slice(data.value())?)),
            None => Ok(None),
        }
    }

    /// Reassemble an object from its chunks in sequence order.
    pub fn download(&self, id: &ObjectId) -> Result<Bytes, BucketError> {
        let key = id.to_hex();
        let read_txn = self.db.begin_read()?;

        let record: FileRecord = {
            let files = read_txn.open_table(self.files_def())?;
            let result = match files.get(key.as_str())? {
                Some(data) => rmp_serde::from_slice(data.value())?,
                None => return Err(BucketError::FileNotFound(*id)),
            };
            result
        };

        let expected = record.chunk_count();
        let chunks = read_txn.open_table(self.chunks_def())?;
        let mut buf = BytesMut::with_capacity(record.length as usize);
        let mut next = 0u32;

        for entry in chunks.range((key.as_str(), 0u32)..(key.as_str(), expected))? {
            let (k, v) = entry?;
            let (_, n) = k.value();
            if n != next {
                return Err(BucketError::CorruptFile {
                    id: *id,
                    reason: format!("missing chunk {next}"),
                });
            }
            buf.extend_from_slice(v.value());
            next += 1;
        }

        if next != expected {
            return Err(BucketError::CorruptFile {
                id: *id,
                reason: format!("expected {expected} chunks, found {next}"),
            });
        }
        if buf.len() as u64 != record.length {
            return Err(BucketError::CorruptFile {
                id: *id,
                reason: format!("expected {} bytes, found {}", record.length, buf.len()),
            });
        }

        Ok(buf.freeze())
    }

    /// Remove a file document and its chunks. Returns false if nothing was stored.
    pub fn delete(&self, id: &ObjectId) -> Result<bool, BucketError> {
        let key = id.to_hex();
        let write_txn = self.db.begin_write()?;

        let record: Option<FileRecord> = {
            let mut files = write_txn.open_table(self.files_def())?;
            let result = match files.remove(key.as_str())? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            result
        };

        let deleted = match record {
            Some(record) => {
                let mut chunks = write_txn.open_table(self.chunks_def())?;
                for n in 0..record.chunk_count() {
                    chunks.remove((key.as_str(), n))?;
                }
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }

    /// All file documents in the bucket, ordered by id (and so by upload time).
    pub fn list(&self) -> Result<Vec<FileRecord>, BucketError> {
        let read_txn = self.db.begin_read()?;
        let files = read_txn.open_table(self.files_def())?;

        let mut records = Vec::new();
        for result in files.iter()? {
            let (_, value) = result?;
            records.push(rmp_serde::from_slice(value.value())?);
        }

        Ok(records)
    }
}
