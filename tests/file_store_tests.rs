use std::sync::Arc;

use bytes::Bytes;
use resume_file_store::file_store::{
    FileLocator, FileStore, FileStoreError, FileStoreSettings, HealthStatus,
};
use resume_file_store::storage::models::{MetadataValue, UploadOptions};
use resume_file_store::storage::Database;

const MISSING: &str = "gridfs://resume-files/507f1f77bcf86cd799439099";

fn persistent_store() -> (tempfile::TempDir, Database, FileStore) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let store = FileStore::new(FileStoreSettings::default(), Some(db.clone()));
    (dir, db, store)
}

fn memory_store() -> FileStore {
    let settings = FileStoreSettings {
        test_mode: true,
        ..Default::default()
    };
    FileStore::new(settings, None)
}

fn assert_persistent_locator(locator: &FileLocator) {
    let raw = locator.to_string();
    let id = raw
        .strip_prefix("gridfs://resume-files/")
        .unwrap_or_else(|| panic!("unexpected locator {raw}"));
    assert_eq!(id.len(), 24);
    assert!(id
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
}

#[tokio::test]
async fn test_hello_world_round_trip() {
    let (_dir, _db, store) = persistent_store();

    let locator = store
        .upload(Bytes::from("hello world"), "greeting.txt", UploadOptions::default())
        .await
        .unwrap();
    assert_persistent_locator(&locator);

    let data = store.download(&locator.to_string()).await.unwrap();
    assert_eq!(data, Bytes::from("hello world"));
}

#[tokio::test]
async fn test_round_trip_in_memory() {
    let store = memory_store();

    let payload: Vec<u8> = (0..=255).collect();
    let locator = store
        .upload(Bytes::from(payload.clone()), "bytes.bin", UploadOptions::default())
        .await
        .unwrap();
    assert_eq!(locator.bucket(), "resume-files");

    let data = store.download(&locator.to_string()).await.unwrap();
    assert_eq!(data.as_ref(), payload.as_slice());
}

#[tokio::test]
async fn test_round_trip_across_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let settings = FileStoreSettings {
        chunk_size: 16,
        ..Default::default()
    };
    let store = FileStore::new(settings, Some(db));

    let payload: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 256) as u8).collect();
    let locator = store
        .upload(Bytes::from(payload.clone()), "resume.docx", UploadOptions::default())
        .await
        .unwrap();

    let record = store.info(&locator.to_string()).await.unwrap();
    assert_eq!(record.chunk_size, 16);
    assert_eq!(record.chunk_count(), 63);

    let data = store.download(&locator.to_string()).await.unwrap();
    assert_eq!(data.as_ref(), payload.as_slice());
}

#[tokio::test]
async fn test_download_never_uploaded_is_not_found() {
    let (_dir, _db, store) = persistent_store();

    let err = store.download(MISSING).await.unwrap_err();
    match err {
        FileStoreError::NotFound(message) => assert!(message.contains(MISSING)),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(err_message(&store.info(MISSING).await).contains(MISSING));
}

fn err_message<T: std::fmt::Debug>(result: &Result<T, FileStoreError>) -> String {
    result.as_ref().unwrap_err().to_string()
}

#[tokio::test]
async fn test_empty_upload_is_invalid_argument() {
    let (_dir, _db, store) = persistent_store();

    let err = store
        .upload(Bytes::new(), "empty.pdf", UploadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FileStoreError::InvalidArgument(_)));

    let err = store
        .upload(Bytes::from("data"), "", UploadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FileStoreError::InvalidArgument(_)));

    let err = memory_store()
        .upload(Bytes::new(), "empty.pdf", UploadOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FileStoreError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_identical_uploads_get_distinct_locators() {
    let (_dir, _db, persistent) = persistent_store();

    for store in [persistent, memory_store()] {
        let first = store
            .upload(Bytes::from("same"), "same.txt", UploadOptions::default())
            .await
            .unwrap();
        let second = store
            .upload(Bytes::from("same"), "same.txt", UploadOptions::default())
            .await
            .unwrap();
        assert_ne!(first, second);
    }
}

#[tokio::test]
async fn test_exists_follows_upload_and_delete() {
    let (_dir, _db, persistent) = persistent_store();

    for store in [persistent, memory_store()] {
        let locator = store
            .upload(Bytes::from("cv"), "cv.pdf", UploadOptions::default())
            .await
            .unwrap()
            .to_string();
        assert!(store.exists(&locator).await.unwrap());

        store.delete(&locator).await.unwrap();
        assert!(!store.exists(&locator).await.unwrap());
        assert!(matches!(
            store.download(&locator).await,
            Err(FileStoreError::NotFound(_))
        ));
    }
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (_dir, _db, store) = persistent_store();

    let locator = store
        .upload(Bytes::from("bye"), "bye.txt", UploadOptions::default())
        .await
        .unwrap()
        .to_string();
    store.delete(&locator).await.unwrap();
    store.delete(&locator).await.unwrap();

    // Never existed
    store.delete(MISSING).await.unwrap();
    memory_store().delete(MISSING).await.unwrap();
}

#[tokio::test]
async fn test_malformed_locators_are_rejected() {
    let (_dir, _db, store) = persistent_store();

    for raw in ["not-a-locator", "gridfs://resume-files/", "s3://resume-files/abc"] {
        assert!(matches!(
            store.download(raw).await,
            Err(FileStoreError::InvalidLocator(_))
        ));
        assert!(matches!(
            store.info(raw).await,
            Err(FileStoreError::InvalidLocator(_))
        ));
        assert!(matches!(
            store.exists(raw).await,
            Err(FileStoreError::InvalidLocator(_))
        ));
        assert!(matches!(
            store.delete(raw).await,
            Err(FileStoreError::InvalidLocator(_))
        ));
    }
}

#[tokio::test]
async fn test_foreign_bucket_and_bad_object_id() {
    let (_dir, _db, store) = persistent_store();

    assert!(matches!(
        store
            .download("gridfs://avatars/507f1f77bcf86cd799439099")
            .await,
        Err(FileStoreError::InvalidLocator(_))
    ));
    assert!(matches!(
        store.download("gridfs://resume-files/not-hex").await,
        Err(FileStoreError::InvalidLocator(_))
    ));
}

#[tokio::test]
async fn test_info_reports_length_and_attributes() {
    let (_dir, _db, store) = persistent_store();

    let options = UploadOptions::default()
        .with_content_type("application/pdf")
        .with_entry("candidateId", "c-17")
        .with_entry("consent", true);
    let locator = store
        .upload(Bytes::from(vec![1u8; 4096]), "Jane Doe.pdf", options)
        .await
        .unwrap();

    let record = store.info(&locator.to_string()).await.unwrap();
    assert_eq!(record.length, 4096);
    assert_eq!(record.filename, "Jane Doe.pdf");
    assert_eq!(record.content_type, "application/pdf");
    assert_eq!(store.locator_for(&record.id), locator);
    let metadata = record.metadata.unwrap();
    assert_eq!(metadata["candidateId"], MetadataValue::from("c-17"));
    assert_eq!(metadata["consent"], MetadataValue::Boolean(true));
}

#[tokio::test]
async fn test_content_type_defaults_to_octet_stream() {
    let store = memory_store();
    let locator = store
        .upload(Bytes::from("x"), "x", UploadOptions::default())
        .await
        .unwrap();
    let record = store.info(&locator.to_string()).await.unwrap();
    assert_eq!(record.content_type, "application/octet-stream");
    assert!(record.metadata.is_none());
}

#[tokio::test]
async fn test_upload_with_record_returns_stored_document() {
    let (_dir, _db, store) = persistent_store();

    let (locator, record) = store
        .upload_with_record(
            Bytes::from("cover letter"),
            "letter.txt",
            UploadOptions::default().with_content_type("text/plain"),
        )
        .await
        .unwrap();
    assert_persistent_locator(&locator);
    assert_eq!(store.locator_for(&record.id), locator);
    assert_eq!(record.length, 12);
    assert_eq!(record.content_type, "text/plain");
    assert_eq!(store.info(&locator.to_string()).await.unwrap(), record);
}

#[tokio::test]
async fn test_falls_back_to_memory_without_connection() {
    let store = FileStore::new(FileStoreSettings::default(), None);

    let locator = store
        .upload(Bytes::from("fallback"), "f.txt", UploadOptions::default())
        .await
        .unwrap()
        .to_string();
    assert_eq!(
        store.download(&locator).await.unwrap(),
        Bytes::from("fallback")
    );

    // Memory misses with no bucket to ask
    assert!(matches!(
        store.download(MISSING).await,
        Err(FileStoreError::BackendUnavailable(_))
    ));
    assert!(matches!(
        store.info(MISSING).await,
        Err(FileStoreError::BackendUnavailable(_))
    ));
    assert!(!store.exists(MISSING).await.unwrap());
}

#[tokio::test]
async fn test_delete_is_idempotent_without_connection() {
    let store = FileStore::new(FileStoreSettings::default(), None);

    let locator = store
        .upload(Bytes::from("fallback"), "f.txt", UploadOptions::default())
        .await
        .unwrap()
        .to_string();

    store.delete(&locator).await.unwrap();
    assert!(!store.exists(&locator).await.unwrap());
    store.delete(&locator).await.unwrap();
    store.delete(MISSING).await.unwrap();
}

#[tokio::test]
async fn test_delete_is_idempotent_after_disconnect() {
    let (_dir, db, store) = persistent_store();
    db.disconnect();

    let locator = store
        .upload(Bytes::from("in memory"), "mem.txt", UploadOptions::default())
        .await
        .unwrap()
        .to_string();

    store.delete(&locator).await.unwrap();
    assert!(!store.exists(&locator).await.unwrap());
    store.delete(&locator).await.unwrap();
}

#[tokio::test]
async fn test_non_hex_id_is_invalid_after_disconnect() {
    let (_dir, db, store) = persistent_store();
    db.disconnect();

    let locator = "gridfs://resume-files/not-hex";
    assert!(matches!(
        store.download(locator).await,
        Err(FileStoreError::InvalidLocator(_))
    ));
    assert!(matches!(
        store.exists(locator).await,
        Err(FileStoreError::InvalidLocator(_))
    ));
    assert!(matches!(
        store.delete(locator).await,
        Err(FileStoreError::InvalidLocator(_))
    ));
}

#[tokio::test]
async fn test_non_hex_id_is_invalid_without_connection() {
    let store = FileStore::new(FileStoreSettings::default(), None);
    assert!(matches!(
        store.info("gridfs://resume-files/not-hex").await,
        Err(FileStoreError::InvalidLocator(_))
    ));
}

#[tokio::test]
async fn test_test_mode_miss_is_not_found() {
    let store = memory_store();
    assert!(matches!(
        store.download(MISSING).await,
        Err(FileStoreError::NotFound(_))
    ));
    assert!(!store.exists(MISSING).await.unwrap());
}

#[tokio::test]
async fn test_test_mode_ignores_ready_connection() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let settings = FileStoreSettings {
        test_mode: true,
        ..Default::default()
    };
    let store = FileStore::new(settings, Some(db.clone()));

    store
        .upload(Bytes::from("memory only"), "m.txt", UploadOptions::default())
        .await
        .unwrap();

    let bucket = db
        .bucket("resume-files", Default::default())
        .unwrap();
    assert!(bucket.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_disconnect_switches_writes_to_memory() {
    let (_dir, db, store) = persistent_store();

    let persisted = store
        .upload(Bytes::from("on disk"), "disk.txt", UploadOptions::default())
        .await
        .unwrap()
        .to_string();

    db.disconnect();

    let in_memory = store
        .upload(Bytes::from("in memory"), "mem.txt", UploadOptions::default())
        .await
        .unwrap()
        .to_string();
    assert_eq!(
        store.download(&in_memory).await.unwrap(),
        Bytes::from("in memory")
    );

    // Reads of bucket-held objects need the bucket
    assert!(matches!(
        store.download(&persisted).await,
        Err(FileStoreError::BackendUnavailable(_))
    ));
    assert!(!store.exists(&persisted).await.unwrap());
    store.delete(&persisted).await.unwrap();
}

#[tokio::test]
async fn test_stores_do_not_share_memory() {
    let a = memory_store();
    let b = memory_store();

    let locator = a
        .upload(Bytes::from("mine"), "a.txt", UploadOptions::default())
        .await
        .unwrap()
        .to_string();
    assert!(a.exists(&locator).await.unwrap());
    assert!(!b.exists(&locator).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_uploads() {
    let (_dir, _db, store) = persistent_store();
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for i in 0..16u8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let payload = Bytes::from(vec![i; 1000 + i as usize]);
            let locator = store
                .upload(payload.clone(), &format!("{i}.bin"), UploadOptions::default())
                .await
                .unwrap();
            (locator, payload)
        }));
    }

    let mut locators = Vec::new();
    for handle in handles {
        let (locator, payload) = handle.await.unwrap();
        assert_eq!(store.download(&locator.to_string()).await.unwrap(), payload);
        locators.push(locator);
    }

    locators.sort_by_key(|l| l.to_string());
    locators.dedup();
    assert_eq!(locators.len(), 16);
}

#[tokio::test]
async fn test_list_includes_both_backends() {
    let (_dir, db, store) = persistent_store();

    let persisted = store
        .upload(Bytes::from("disk"), "disk.txt", UploadOptions::default())
        .await
        .unwrap();

    // Hides the bucket from list and routes the next write to memory
    db.disconnect();
    let in_memory = store
        .upload(Bytes::from("mem"), "mem.txt", UploadOptions::default())
        .await
        .unwrap();

    let listed: Vec<FileLocator> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|(locator, _)| locator)
        .collect();
    assert_eq!(listed, vec![in_memory]);
    assert!(!listed.contains(&persisted));
}

#[tokio::test]
async fn test_list_persistent_records() {
    let (_dir, _db, store) = persistent_store();

    let first = store
        .upload(Bytes::from("1"), "1.txt", UploadOptions::default())
        .await
        .unwrap();
    let second = store
        .upload(Bytes::from("2"), "2.txt", UploadOptions::default())
        .await
        .unwrap();

    let listed: Vec<FileLocator> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|(locator, _)| locator)
        .collect();
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&first));
    assert!(listed.contains(&second));
}

#[tokio::test]
async fn test_health_check() {
    let (_dir, db, store) = persistent_store();

    let health = store.health_check();
    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.bucket_name, "resume-files");
    assert!(health.connected);

    db.disconnect();
    let health = store.health_check();
    assert_eq!(health.status, HealthStatus::Unhealthy);
    assert!(!health.connected);

    let detached = FileStore::new(FileStoreSettings::default(), None).health_check();
    assert_eq!(detached.status, HealthStatus::Unhealthy);
    assert!(!detached.connected);

    let in_test_mode = memory_store().health_check();
    assert_eq!(in_test_mode.status, HealthStatus::Healthy);
    assert!(!in_test_mode.connected);
}
