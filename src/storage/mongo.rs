use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::options::FindOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::models::{Event, EventFiles, EventPatch, NewEvent, UpdateOutcome, EVENT_KIND};
use super::{EventStore, StoreError};

const COLLECTION: &str = "events";

/// Shape of an event document inside MongoDB.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EventDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    #[serde(rename = "type")]
    kind: String,
    uid: i64,
    name: String,
    tagline: String,
    schedule: BsonDateTime,
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    moderator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub_category: Option<String>,
    rigor_rank: i64,
    #[serde(default)]
    attendees: Vec<Bson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    files: Option<EventFiles>,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl From<NewEvent> for EventDocument {
    fn from(event: NewEvent) -> Self {
        let created_at = to_bson_datetime(event.created_at);
        Self {
            id: None,
            kind: EVENT_KIND.to_string(),
            uid: event.uid,
            name: event.name,
            tagline: event.tagline,
            schedule: to_bson_datetime(event.schedule),
            description: event.description,
            moderator: event.moderator,
            category: event.category,
            sub_category: event.sub_category,
            rigor_rank: event.rigor_rank,
            attendees: Vec::new(),
            files: event.files,
            created_at,
            updated_at: created_at,
        }
    }
}

impl EventDocument {
    fn into_event(self) -> Result<Event, StoreError> {
        let id = self
            .id
            .ok_or_else(|| StoreError::InvalidDocument("event document without _id".to_string()))?;

        Ok(Event {
            id: id.to_hex(),
            kind: self.kind,
            created_at: from_bson_datetime(self.created_at),
            updated_at: from_bson_datetime(self.updated_at),
            uid: self.uid,
            name: self.name,
            tagline: self.tagline,
            schedule: from_bson_datetime(self.schedule),
            description: self.description,
            moderator: self.moderator,
            category: self.category,
            sub_category: self.sub_category,
            rigor_rank: self.rigor_rank,
            attendees: self.attendees.into_iter().map(attendee_id).collect(),
            files: self.files,
        })
    }
}

fn attendee_id(value: Bson) -> String {
    match value {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s,
        other => other.to_string(),
    }
}

fn to_bson_datetime(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

fn from_bson_datetime(dt: BsonDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
}

fn id_filter(id: &str) -> Result<Document, StoreError> {
    let oid = ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))?;
    Ok(doc! { "_id": oid })
}

/// Build the `$set` document for a partial update. Absent fields are omitted.
fn set_document(patch: &EventPatch) -> Document {
    let mut set = Document::new();

    if let Some(uid) = patch.uid {
        set.insert("uid", uid);
    }
    if let Some(name) = &patch.name {
        set.insert("name", name.as_str());
    }
    if let Some(tagline) = &patch.tagline {
        set.insert("tagline", tagline.as_str());
    }
    if let Some(schedule) = patch.schedule {
        set.insert("schedule", to_bson_datetime(schedule));
    }
    if let Some(description) = &patch.description {
        set.insert("description", description.as_str());
    }
    if let Some(moderator) = &patch.moderator {
        set.insert("moderator", moderator.as_str());
    }
    if let Some(category) = &patch.category {
        set.insert("category", category.as_str());
    }
    if let Some(sub_category) = &patch.sub_category {
        set.insert("sub_category", sub_category.as_str());
    }
    if let Some(rigor_rank) = patch.rigor_rank {
        set.insert("rigor_rank", rigor_rank);
    }
    if let Some(files) = &patch.files {
        set.insert("files", doc! { "image": files.image.as_str() });
    }
    set.insert("updated_at", to_bson_datetime(patch.updated_at));

    set
}

/// MongoDB-backed event store.
#[derive(Clone)]
pub struct MongoStore {
    database: Database,
    collection: Collection<EventDocument>,
}

impl MongoStore {
    /// Connect, verify the server answers, and ensure indexes exist.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let store = Self::new(&client.database(database));
        store.ping().await?;
        store.create_indexes().await?;
        Ok(store)
    }

    pub fn new(database: &Database) -> Self {
        Self {
            database: database.clone(),
            collection: database.collection(COLLECTION),
        }
    }

    /// Index backing the latest-first listing
    pub async fn create_indexes(&self) -> Result<(), StoreError> {
        let index = IndexModel::builder().keys(doc! { "schedule": -1 }).build();
        self.collection.create_index(index).await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for MongoStore {
    #[instrument(skip(self, event), fields(event_name = %event.name))]
    async fn insert(&self, event: NewEvent) -> Result<String, StoreError> {
        let document = EventDocument::from(event);
        let result = self.collection.insert_one(&document).await?;
        result
            .inserted_id
            .as_object_id()
            .map(|oid| oid.to_hex())
            .ok_or_else(|| StoreError::InvalidDocument("inserted _id is not an ObjectId".into()))
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, StoreError> {
        let document = self.collection.find_one(id_filter(id)?).await?;
        document.map(EventDocument::into_event).transpose()
    }

    #[instrument(skip(self))]
    async fn find_latest(&self, skip: u64, limit: u64) -> Result<Vec<Event>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "schedule": -1 })
            .skip(skip.min(i64::MAX as u64))
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .build();

        let cursor = self.collection.find(doc! {}).with_options(options).await?;
        let documents: Vec<EventDocument> = cursor.try_collect().await?;
        documents.into_iter().map(EventDocument::into_event).collect()
    }

    #[instrument(skip(self))]
    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: &str, patch: &EventPatch) -> Result<UpdateOutcome, StoreError> {
        let update = doc! { "$set": set_document(patch) };
        let result = self.collection.update_one(id_filter(id)?, update).await?;
        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<u64, StoreError> {
        let result = self.collection.delete_one(id_filter(id)?).await?;
        Ok(result.deleted_count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}
