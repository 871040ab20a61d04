use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::user::UserId;

pub type AnnouncementId = u64;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TargetAudience {
    All,
    Employees,
    Managers,
}

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Default,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Plain notices carry no schedule; events must carry all of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnouncementKind {
    Plain,
    Event {
        #[schema(example = "2026-11-15", format = "date", value_type = String)]
        event_date: NaiveDate,
        #[schema(example = "14:00", value_type = String)]
        start_time: NaiveTime,
        #[schema(example = "16:00", value_type = String)]
        end_time: NaiveTime,
        #[schema(example = "Main Conference Room")]
        location: String,
    },
}

impl AnnouncementKind {
    pub fn is_event(&self) -> bool {
        matches!(self, AnnouncementKind::Event { .. })
    }

    pub fn event_date(&self) -> Option<NaiveDate> {
        match self {
            AnnouncementKind::Event { event_date, .. } => Some(*event_date),
            AnnouncementKind::Plain => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Announcement {
    #[schema(example = 1)]
    pub id: AnnouncementId,
    /// Creator of the announcement.
    #[schema(example = 2)]
    pub owner_id: UserId,
    pub target_audience: TargetAudience,
    pub is_active: bool,
    #[schema(example = "Company Town Hall Meeting")]
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub kind: AnnouncementKind,
    #[schema(format = "date-time", value_type = String)]
    pub created_date: DateTime<Utc>,
}

impl Announcement {
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term) || self.content.to_lowercase().contains(&term)
    }

    /// An event scheduled strictly after `today`.
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.kind.event_date().is_some_and(|date| date > today)
    }
}

/// Create or replace payload for announcements.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AnnouncementInput {
    #[schema(example = "Team Building Event")]
    pub title: String,
    #[schema(example = "Join us for a fun team building event at the local park.")]
    pub content: String,
    #[serde(default)]
    pub priority: Priority,
    pub target_audience: TargetAudience,
    pub kind: AnnouncementKind,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// An input that passed validation and is ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnnouncement {
    pub owner_id: UserId,
    pub target_audience: TargetAudience,
    pub is_active: bool,
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub kind: AnnouncementKind,
    pub created_date: DateTime<Utc>,
}

impl NewAnnouncement {
    pub fn with_id(self, id: AnnouncementId) -> Announcement {
        Announcement {
            id,
            owner_id: self.owner_id,
            target_audience: self.target_audience,
            is_active: self.is_active,
            title: self.title,
            content: self.content,
            priority: self.priority,
            kind: self.kind,
            created_date: self.created_date,
        }
    }
}
