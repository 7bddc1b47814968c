//! Shared test helpers for handler tests.

use std::sync::Arc;

use crate::config::{Config, NodeConfig, StorageConfig};
use crate::file_store::{FileStore, FileStoreSettings};
use crate::storage::Database;
use crate::AppState;

fn test_config(temp_dir: &tempfile::TempDir, test_mode: bool) -> Config {
    Config {
        node: NodeConfig {
            id: uuid::Uuid::new_v4().to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: temp_dir.path().join("data").to_string_lossy().to_string(),
        },
        storage: StorageConfig::default(),
        test_mode,
        max_upload_size: 10 * 1024 * 1024, // 10MB for tests
    }
}

/// AppState backed by a temporary on-disk database.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let config = test_config(temp_dir, false);
    let db = Database::open(&config.node.data_dir).expect("Failed to open test database");
    let file_store = FileStore::new(FileStoreSettings::from(&config), Some(db.clone()));

    Arc::new(AppState {
        config,
        db: Some(db),
        file_store: Arc::new(file_store),
    })
}

/// AppState in test mode: in-memory file store, no database.
pub fn memory_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let config = test_config(temp_dir, true);
    let file_store = FileStore::new(FileStoreSettings::from(&config), None);

    Arc::new(AppState {
        config,
        db: None,
        file_store: Arc::new(file_store),
    })
}
