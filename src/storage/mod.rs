mod error;
mod local;
pub mod models;
mod mongo;
mod tables;

pub use error::StoreError;
pub use local::RedbStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use models::{Event, EventPatch, NewEvent, UpdateOutcome};

/// Abstraction over the document store holding events.
/// Identifiers are 24-digit hex ObjectIds in every backend.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist a new event and return the identifier the store assigned.
    async fn insert(&self, event: NewEvent) -> Result<String, StoreError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, StoreError>;
    /// Events ordered by `schedule` descending, after skipping `skip`.
    async fn find_latest(&self, skip: u64, limit: u64) -> Result<Vec<Event>, StoreError>;
    /// Count of every document in the collection.
    async fn count(&self) -> Result<u64, StoreError>;
    async fn update(&self, id: &str, patch: &EventPatch) -> Result<UpdateOutcome, StoreError>;
    /// Returns the number of deleted documents (0 or 1).
    async fn delete(&self, id: &str) -> Result<u64, StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Generate a fresh event identifier.
pub fn new_event_id() -> String {
    ObjectId::new().to_hex()
}

/// Check whether `id` has the shape of an event identifier.
pub fn is_valid_event_id(id: &str) -> bool {
    ObjectId::parse_str(id).is_ok()
}
