//! event-api - HTTP CRUD service for events backed by a document store
//!
//! This crate provides:
//! - Get-by-id, latest-first paginated listing, create, update and delete of events
//! - Swappable store backends (MongoDB, embedded redb)
//! - Optional image upload on create/update, served back under `/uploads`

pub mod api;
pub mod config;
pub mod service;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod uploads;

use std::sync::Arc;

use config::Config;
use service::EventService;
use uploads::UploadStore;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub events: EventService,
    pub uploads: Arc<UploadStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn storage::EventStore>,
        uploads: Arc<UploadStore>,
    ) -> Self {
        let events = EventService::new(store, Arc::clone(&uploads), config.max_page_limit);
        Self {
            config,
            events,
            uploads,
        }
    }
}
