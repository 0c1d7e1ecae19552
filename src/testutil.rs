//! Shared test helpers for router and service tests.

use std::sync::Arc;

use crate::config::{Config, StoreBackend, StoreConfig, UploadConfig};
use crate::storage::RedbStore;
use crate::uploads::UploadStore;
use crate::AppState;

/// Create a test AppState with a temporary redb store and upload directory.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let upload_dir = temp_dir.path().join("uploads");

    let config = Config {
        store: StoreConfig {
            backend: StoreBackend::Redb,
            data_dir: data_dir.to_string_lossy().to_string(),
            ..StoreConfig::default()
        },
        uploads: UploadConfig {
            dir: upload_dir.to_string_lossy().to_string(),
            max_size: 1024 * 1024, // 1MB for tests
        },
        ..Config::default()
    };

    let store = RedbStore::open(&data_dir).expect("Failed to open test store");
    let uploads = UploadStore::new(&upload_dir, config.uploads.max_size)
        .expect("Failed to create test upload directory");

    Arc::new(AppState::new(config, Arc::new(store), Arc::new(uploads)))
}
