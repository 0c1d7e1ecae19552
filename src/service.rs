//! The event operations: get-by-id, list-latest, create, update and delete.
//!
//! Handlers hand over raw, untyped input (`EventInput`, query strings) and
//! this layer does all normalization before touching the store.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::storage::models::{Event, EventFiles, EventPatch, NewEvent};
use crate::storage::{is_valid_event_id, EventStore, StoreError};
use crate::uploads::{ImageUpload, UploadError, UploadStore};

const DEFAULT_UID: i64 = 1;
const DEFAULT_RIGOR_RANK: i64 = 0;
const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 5;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Internal(e.to_string())
    }
}

impl From<UploadError> for ServiceError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::Rejected(message) => ServiceError::Validation(message),
            UploadError::Io(e) => ServiceError::Internal(format!("Failed to store upload: {e}")),
        }
    }
}

fn event_not_found() -> ServiceError {
    ServiceError::NotFound("Event not found".to_string())
}

// ============================================================================
// Input types
// ============================================================================

/// Raw event fields as submitted by the client. `None` means absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventInput {
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub schedule: Option<String>,
    pub description: Option<String>,
    pub moderator: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub rigor_rank: Option<String>,
    pub uid: Option<String>,
}

impl EventInput {
    /// Record a named field. Unknown fields are ignored.
    pub fn set(&mut self, field: &str, value: String) {
        let slot = match field {
            "name" => &mut self.name,
            "tagline" => &mut self.tagline,
            "schedule" => &mut self.schedule,
            "description" => &mut self.description,
            "moderator" => &mut self.moderator,
            "category" => &mut self.category,
            "sub_category" => &mut self.sub_category,
            "rigor_rank" => &mut self.rigor_rank,
            "uid" => &mut self.uid,
            _ => return,
        };
        *slot = Some(value);
    }
}

/// Effective pagination after defaults and clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Parse `page`/`limit`. Non-numeric values are rejected; values below 1
    /// clamp to 1 and `limit` clamps to `max_limit`. A page whose offset
    /// overflows the store range is rejected.
    pub fn parse(
        page: Option<&str>,
        limit: Option<&str>,
        max_limit: u64,
    ) -> Result<Self, ServiceError> {
        let page = match page {
            Some(raw) => clamp(parse_integer(raw).ok_or_else(|| {
                ServiceError::Validation("page must be an integer".to_string())
            })?),
            None => DEFAULT_PAGE,
        };
        let limit = match limit {
            Some(raw) => clamp(parse_integer(raw).ok_or_else(|| {
                ServiceError::Validation("limit must be an integer".to_string())
            })?),
            None => DEFAULT_LIMIT,
        };

        let limit = limit.min(max_limit.max(1));

        // Store backends take the offset as a signed 64-bit integer
        let in_range = (page - 1)
            .checked_mul(limit)
            .is_some_and(|skip| i64::try_from(skip).is_ok());
        if !in_range {
            return Err(ServiceError::Validation("page is out of range".to_string()));
        }

        Ok(Self { page, limit })
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn clamp(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0).max(1)
}

// ============================================================================
// Output types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

#[derive(Debug, Clone)]
pub struct EventPage {
    pub events: Vec<Event>,
    pub pagination: Pagination,
}

// ============================================================================
// Service
// ============================================================================

/// Event operations over a shared store handle and the upload directory.
pub struct EventService {
    store: Arc<dyn EventStore>,
    uploads: Arc<UploadStore>,
    max_page_limit: u64,
}

impl EventService {
    pub fn new(
        store: Arc<dyn EventStore>,
        uploads: Arc<UploadStore>,
        max_page_limit: u64,
    ) -> Self {
        Self {
            store,
            uploads,
            max_page_limit,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_event(&self, id: Option<&str>) -> Result<Event, ServiceError> {
        let id = id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ServiceError::Validation("Event ID is required".to_string()))?;

        if !is_valid_event_id(id) {
            debug!(event_id = %id, "Malformed event id");
            return Err(event_not_found());
        }

        self.store.find_by_id(id).await?.ok_or_else(event_not_found)
    }

    #[instrument(skip(self))]
    pub async fn list_latest(
        &self,
        page: Option<&str>,
        limit: Option<&str>,
    ) -> Result<EventPage, ServiceError> {
        let request = PageRequest::parse(page, limit, self.max_page_limit)?;

        let events = self
            .store
            .find_latest(request.skip(), request.limit)
            .await?;
        let total = self.store.count().await?;

        Ok(EventPage {
            events,
            pagination: Pagination {
                page: request.page,
                limit: request.limit,
                total,
                total_pages: total.div_ceil(request.limit),
            },
        })
    }

    /// Create an event, returning its new identifier.
    #[instrument(skip(self, input, image))]
    pub async fn create_event(
        &self,
        input: EventInput,
        image: Option<ImageUpload>,
    ) -> Result<String, ServiceError> {
        let (name, tagline, schedule, description) = match (
            non_empty(input.name),
            non_empty(input.tagline),
            non_empty(input.schedule),
            non_empty(input.description),
        ) {
            (Some(name), Some(tagline), Some(schedule), Some(description)) => {
                (name, tagline, schedule, description)
            }
            _ => return Err(ServiceError::Validation("Required fields missing".to_string())),
        };

        let schedule = parse_schedule(&schedule)
            .ok_or_else(|| ServiceError::Validation("Invalid schedule date".to_string()))?;

        let image_path = self.store_image(image).await?;
        let now = Utc::now();

        let event = NewEvent {
            uid: input
                .uid
                .as_deref()
                .and_then(parse_integer)
                .unwrap_or(DEFAULT_UID),
            name,
            tagline,
            schedule,
            description,
            moderator: non_empty(input.moderator),
            category: non_empty(input.category),
            sub_category: non_empty(input.sub_category),
            rigor_rank: input
                .rigor_rank
                .as_deref()
                .and_then(parse_integer)
                .unwrap_or(DEFAULT_RIGOR_RANK),
            files: image_path.clone().map(|image| EventFiles { image }),
            created_at: now,
        };

        match self.store.insert(event).await {
            Ok(id) => {
                info!(event_id = %id, "Created event");
                Ok(id)
            }
            Err(e) => {
                self.discard_image(image_path.as_deref()).await;
                Err(e.into())
            }
        }
    }

    /// Apply a partial update, returning the store's modified count.
    #[instrument(skip(self, input, image))]
    pub async fn update_event(
        &self,
        id: &str,
        input: EventInput,
        image: Option<ImageUpload>,
    ) -> Result<u64, ServiceError> {
        if !is_valid_event_id(id) {
            debug!(event_id = %id, "Malformed event id");
            return Err(event_not_found());
        }

        let mut patch = EventPatch {
            uid: optional_integer(input.uid, "uid")?,
            name: required_if_present(input.name, "name")?,
            tagline: required_if_present(input.tagline, "tagline")?,
            description: required_if_present(input.description, "description")?,
            moderator: input.moderator,
            category: input.category,
            sub_category: input.sub_category,
            rigor_rank: optional_integer(input.rigor_rank, "rigor_rank")?,
            ..EventPatch::touch(Utc::now())
        };

        if let Some(raw) = required_if_present(input.schedule, "schedule")? {
            patch.schedule = Some(
                parse_schedule(&raw)
                    .ok_or_else(|| ServiceError::Validation("Invalid schedule date".to_string()))?,
            );
        }

        let image_path = self.store_image(image).await?;
        patch.files = image_path.clone().map(|image| EventFiles { image });

        let outcome = match self.store.update(id, &patch).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.discard_image(image_path.as_deref()).await;
                return Err(e.into());
            }
        };

        if outcome.matched == 0 {
            self.discard_image(image_path.as_deref()).await;
            return Err(event_not_found());
        }

        info!(event_id = %id, modified = outcome.modified, "Updated event");
        Ok(outcome.modified)
    }

    /// Hard-delete an event, returning the deleted count. Its image stays on disk.
    #[instrument(skip(self))]
    pub async fn delete_event(&self, id: &str) -> Result<u64, ServiceError> {
        if !is_valid_event_id(id) {
            debug!(event_id = %id, "Malformed event id");
            return Err(event_not_found());
        }

        let deleted = self.store.delete(id).await?;
        if deleted == 0 {
            return Err(event_not_found());
        }

        info!(event_id = %id, "Deleted event");
        Ok(deleted)
    }

    pub async fn store_health(&self) -> Result<(), ServiceError> {
        Ok(self.store.ping().await?)
    }

    async fn store_image(
        &self,
        image: Option<ImageUpload>,
    ) -> Result<Option<String>, ServiceError> {
        match image {
            Some(upload) => Ok(Some(self.uploads.save(&upload).await?)),
            None => Ok(None),
        }
    }

    /// Best-effort removal of an image whose event write did not happen.
    async fn discard_image(&self, path: Option<&str>) {
        if let Some(path) = path {
            if let Err(e) = self.uploads.remove(path).await {
                warn!(path = %path, error = %e, "Failed to remove orphaned upload");
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required_if_present(value: Option<String>, field: &str) -> Result<Option<String>, ServiceError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ServiceError::Validation(format!(
            "{field} must not be empty"
        ))),
        other => Ok(other),
    }
}

fn optional_integer(value: Option<String>, field: &str) -> Result<Option<i64>, ServiceError> {
    value
        .map(|raw| {
            parse_integer(&raw)
                .ok_or_else(|| ServiceError::Validation(format!("{field} must be an integer")))
        })
        .transpose()
}

/// Leading-integer parse: optional sign followed by digits, trailing text ignored.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS[.fff]` (UTC) and `YYYY-MM-DD` (midnight UTC).
pub fn parse_schedule(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
