use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::form::EventForm;
use crate::api::response::{ApiError, AppQuery};
use crate::service::Pagination;
use crate::storage::models::{Event, EventFiles};
use crate::AppState;

/// `type` value selecting the latest-first listing.
const LIST_LATEST: &str = "latest";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct EventResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub uid: i64,
    pub name: String,
    pub tagline: String,
    pub schedule: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    pub rigor_rank: i64,
    pub attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<EventFiles>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct EventListResponse {
    pub events: Vec<EventResponse>,
    pub pagination: Pagination,
}

/// `GET /events` query. Everything stays a string so that the service
/// decides how malformed values are reported.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub message: String,
    pub event_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatedResponse {
    pub message: String,
    pub modified_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub message: String,
    pub deleted_count: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /events?id=<id>` fetches one event, `GET /events?type=latest` lists.
pub async fn query_events(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<EventsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if query.id.is_some() {
        let event = state.events.get_event(query.id.as_deref()).await?;
        return Ok(Json(to_json(&to_response(&event))?));
    }

    if query.kind.as_deref() == Some(LIST_LATEST) {
        let page = state
            .events
            .list_latest(query.page.as_deref(), query.limit.as_deref())
            .await?;
        let body = EventListResponse {
            events: page.events.iter().map(to_response).collect(),
            pagination: page.pagination,
        };
        return Ok(Json(to_json(&body)?));
    }

    Err(ApiError::bad_request(
        "Invalid query parameters: expected id or type=latest",
    ))
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    form: EventForm,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let event_id = state.events.create_event(form.input, form.image).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Event created successfully".to_string(),
            event_id,
        }),
    ))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    form: EventForm,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let modified_count = state
        .events
        .update_event(&id, form.input, form.image)
        .await?;

    Ok(Json(UpdatedResponse {
        message: "Event updated successfully".to_string(),
        modified_count,
    }))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted_count = state.events.delete_event(&id).await?;

    Ok(Json(DeletedResponse {
        message: "Event deleted successfully".to_string(),
        deleted_count,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(e.to_string()))
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn to_response(event: &Event) -> EventResponse {
    EventResponse {
        id: event.id.clone(),
        kind: event.kind.clone(),
        uid: event.uid,
        name: event.name.clone(),
        tagline: event.tagline.clone(),
        schedule: timestamp(&event.schedule),
        description: event.description.clone(),
        moderator: event.moderator.clone(),
        category: event.category.clone(),
        sub_category: event.sub_category.clone(),
        rigor_rank: event.rigor_rank,
        attendees: event.attendees.clone(),
        files: event.files.clone(),
        created_at: timestamp(&event.created_at),
        updated_at: timestamp(&event.updated_at),
    }
}
