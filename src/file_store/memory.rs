use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use chrono::Utc;

use crate::storage::models::{FileRecord, UploadOptions};
use crate::storage::ObjectId;

struct StoredObject {
    data: Bytes,
    record: FileRecord,
}

/// Process-local fallback store. Owned by one `FileStore`; lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<String, StoredObject>> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy `data` into the store under a fresh id.
    pub fn insert(
        &self,
        filename: &str,
        data: &[u8],
        options: &UploadOptions,
        chunk_size: u32,
    ) -> FileRecord {
        let record = FileRecord {
            id: ObjectId::new(),
            filename: filename.to_string(),
            content_type: options.content_type_or_default(),
            length: data.len() as u64,
            chunk_size,
            upload_date: Utc::now(),
            metadata: options.metadata.clone(),
        };

        self.objects().insert(
            record.id.to_hex(),
            StoredObject {
                data: Bytes::copy_from_slice(data),
                record: record.clone(),
            },
        );
        record
    }

    pub fn contains(&self, token: &str) -> bool {
        self.objects().contains_key(token)
    }

    pub fn data(&self, token: &str) -> Option<Bytes> {
        self.objects().get(token).map(|o| o.data.clone())
    }

    pub fn record(&self, token: &str) -> Option<FileRecord> {
        self.objects().get(token).map(|o| o.record.clone())
    }

    pub fn remove(&self, token: &str) -> bool {
        self.objects().remove(token).is_some()
    }

    /// Records ordered by id.
    pub fn records(&self) -> Vec<FileRecord> {
        let mut records: Vec<FileRecord> =
            self.objects().values().map(|o| o.record.clone()).collect();
        records.sort_by_key(|r| r.id);
        records
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
