//! resume-file-store - chunked large-object storage for resume documents
//!
//! This crate provides upload, download and metadata lookup of binary files with:
//! - Opaque `gridfs://<bucket>/<id>` locators
//! - A chunked bucket on the redb embedded database (ACID, crash-safe)
//! - An in-memory fallback for test mode or when the bucket is unavailable
//! - REST API with multipart upload support and an aggregated health check

pub mod api;
pub mod config;
pub mod file_store;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use config::Config;
use file_store::FileStore;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    /// `None` in test mode, where nothing touches disk.
    pub db: Option<Database>,
    pub file_store: Arc<FileStore>,
}
