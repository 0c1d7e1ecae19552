use async_trait::async_trait;
use redb::{Database, ReadTransaction, ReadableTable, ReadableTableMetadata, WriteTransaction};
use std::path::Path;
use std::sync::Arc;

use super::models::{Event, EventPatch, NewEvent, UpdateOutcome};
use super::tables::*;
use super::{new_event_id, EventStore, StoreError};

/// Embedded single-file event store backed by redb.
pub struct RedbStore {
    db: Arc<Database>,
}

impl Clone for RedbStore {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

impl RedbStore {
    /// Open or create a store in the given directory
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("events.redb");
        let db = Arc::new(Database::create(db_path)?);

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(EVENTS)?;
            let _ = write_txn.open_table(EVENTS_BY_SCHEDULE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn begin_read(&self) -> Result<ReadTransaction, StoreError> {
        Ok(self.db.begin_read()?)
    }

    fn begin_write(&self) -> Result<WriteTransaction, StoreError> {
        Ok(self.db.begin_write()?)
    }

    /// Store an event under its own id and index it by schedule
    pub fn put_event(&self, event: &Event) -> Result<(), StoreError> {
        debug_assert!(!event.id.is_empty(), "event id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(EVENTS)?;
            let data = rmp_serde::to_vec_named(event)?;
            table.insert(event.id.as_str(), data.as_slice())?;

            let mut index = write_txn.open_table(EVENTS_BY_SCHEDULE)?;
            index.insert((event.schedule.timestamp_millis(), event.id.as_str()), ())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_event(&self, id: &str) -> Result<Option<Event>, StoreError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(EVENTS)?;

        match table.get(id)? {
            Some(data) => {
                let event: Event = rmp_serde::from_slice(data.value())?;
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }

    /// Walk the schedule index from the latest entry backwards
    pub fn latest_events(&self, skip: u64, limit: u64) -> Result<Vec<Event>, StoreError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(EVENTS_BY_SCHEDULE)?;
        let table = read_txn.open_table(EVENTS)?;

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        let mut events = Vec::new();
        for entry in index.iter()?.rev().skip(skip).take(limit) {
            let (key, _) = entry?;
            let (_, id) = key.value();
            if let Some(data) = table.get(id)? {
                let event: Event = rmp_serde::from_slice(data.value())?;
                events.push(event);
            }
        }

        Ok(events)
    }

    pub fn event_count(&self) -> Result<u64, StoreError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(EVENTS)?;
        Ok(table.len()?)
    }

    /// Apply a partial update, moving the schedule index entry when needed
    pub fn patch_event(&self, id: &str, patch: &EventPatch) -> Result<UpdateOutcome, StoreError> {
        let write_txn = self.begin_write()?;

        let existing = {
            let table = write_txn.open_table(EVENTS)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let event: Event = rmp_serde::from_slice(data.value())?;
                    Some(event)
                }
                None => None,
            };
            result
        };

        let outcome = match existing {
            Some(mut event) => {
                let old_schedule = event.schedule.timestamp_millis();
                let modified = patch.apply(&mut event);

                if modified {
                    let new_schedule = event.schedule.timestamp_millis();
                    if new_schedule != old_schedule {
                        let mut index = write_txn.open_table(EVENTS_BY_SCHEDULE)?;
                        index.remove((old_schedule, id))?;
                        index.insert((new_schedule, id), ())?;
                    }

                    let serialized = rmp_serde::to_vec_named(&event)?;
                    let mut table = write_txn.open_table(EVENTS)?;
                    table.insert(id, serialized.as_slice())?;
                }

                UpdateOutcome {
                    matched: 1,
                    modified: u64::from(modified),
                }
            }
            None => UpdateOutcome::default(),
        };

        write_txn.commit()?;
        Ok(outcome)
    }

    /// Delete an event and its schedule index entry
    pub fn remove_event(&self, id: &str) -> Result<bool, StoreError> {
        let write_txn = self.begin_write()?;

        let schedule: Option<i64> = {
            let table = write_txn.open_table(EVENTS)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let event: Event = rmp_serde::from_slice(data.value())?;
                    Some(event.schedule.timestamp_millis())
                }
                None => None,
            };
            result
        };

        let deleted = match schedule {
            Some(schedule) => {
                {
                    let mut table = write_txn.open_table(EVENTS)?;
                    table.remove(id)?;
                }
                {
                    let mut index = write_txn.open_table(EVENTS_BY_SCHEDULE)?;
                    index.remove((schedule, id))?;
                }
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }
}

#[async_trait]
impl EventStore for RedbStore {
    async fn insert(&self, event: NewEvent) -> Result<String, StoreError> {
        let id = new_event_id();
        let event = event.into_event(id.clone());
        self.put_event(&event)?;
        Ok(id)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, StoreError> {
        self.get_event(id)
    }

    async fn find_latest(&self, skip: u64, limit: u64) -> Result<Vec<Event>, StoreError> {
        self.latest_events(skip, limit)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.event_count()
    }

    async fn update(&self, id: &str, patch: &EventPatch) -> Result<UpdateOutcome, StoreError> {
        self.patch_event(id, patch)
    }

    async fn delete(&self, id: &str) -> Result<u64, StoreError> {
        Ok(u64::from(self.remove_event(id)?))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let read_txn = self.begin_read()?;
        let _ = read_txn.open_table(EVENTS)?;
        Ok(())
    }
}
