use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Constant `type` tag carried by every event document.
pub const EVENT_KIND: &str = "event";

/// Attachments recorded on an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFiles {
    /// Public path of the uploaded image (`/uploads/<name>`)
    pub image: String,
}

/// An event as stored in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    // System fields
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub uid: i64,
    pub name: String,
    pub tagline: String,
    pub schedule: DateTime<Utc>,
    pub description: String,
    #[serde(default)]
    pub moderator: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sub_category: Option<String>,
    pub rigor_rank: i64,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub files: Option<EventFiles>,
}

/// A fully normalized event that has not been assigned an identifier yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub uid: i64,
    pub name: String,
    pub tagline: String,
    pub schedule: DateTime<Utc>,
    pub description: String,
    pub moderator: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub rigor_rank: i64,
    pub files: Option<EventFiles>,
    pub created_at: DateTime<Utc>,
}

impl NewEvent {
    /// Attach the store-assigned identifier.
    pub fn into_event(self, id: String) -> Event {
        Event {
            id,
            kind: EVENT_KIND.to_string(),
            created_at: self.created_at,
            updated_at: self.created_at,
            uid: self.uid,
            name: self.name,
            tagline: self.tagline,
            schedule: self.schedule,
            description: self.description,
            moderator: self.moderator,
            category: self.category,
            sub_category: self.sub_category,
            rigor_rank: self.rigor_rank,
            attendees: Vec::new(),
            files: self.files,
        }
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPatch {
    pub uid: Option<i64>,
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub schedule: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub moderator: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub rigor_rank: Option<i64>,
    pub files: Option<EventFiles>,
    pub updated_at: DateTime<Utc>,
}

impl EventPatch {
    /// A patch that only refreshes `updated_at`.
    pub fn touch(updated_at: DateTime<Utc>) -> Self {
        Self {
            uid: None,
            name: None,
            tagline: None,
            schedule: None,
            description: None,
            moderator: None,
            category: None,
            sub_category: None,
            rigor_rank: None,
            files: None,
            updated_at,
        }
    }

    /// Apply the patch in place. Returns whether any stored value changed.
    pub fn apply(&self, event: &mut Event) -> bool {
        let mut changed = false;

        set(&mut event.uid, &self.uid, &mut changed);
        set(&mut event.name, &self.name, &mut changed);
        set(&mut event.tagline, &self.tagline, &mut changed);
        set(&mut event.schedule, &self.schedule, &mut changed);
        set(&mut event.description, &self.description, &mut changed);
        set_optional(&mut event.moderator, &self.moderator, &mut changed);
        set_optional(&mut event.category, &self.category, &mut changed);
        set_optional(&mut event.sub_category, &self.sub_category, &mut changed);
        set(&mut event.rigor_rank, &self.rigor_rank, &mut changed);
        set_optional(&mut event.files, &self.files, &mut changed);
        set(&mut event.updated_at, &Some(self.updated_at), &mut changed);

        changed
    }
}

fn set<T: Clone + PartialEq>(slot: &mut T, value: &Option<T>, changed: &mut bool) {
    if let Some(v) = value {
        if slot != v {
            *slot = v.clone();
            *changed = true;
        }
    }
}

fn set_optional<T: Clone + PartialEq>(slot: &mut Option<T>, value: &Option<T>, changed: &mut bool) {
    if let Some(v) = value {
        if slot.as_ref() != Some(v) {
            *slot = Some(v.clone());
            *changed = true;
        }
    }
}

/// Result of an update, mirroring the store's matched/modified counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}
