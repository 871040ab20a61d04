use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::model::user::UserId;

pub type LeaveId = u64;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Sick,
    Vacation,
    Personal,
    Maternity,
    Paternity,
    Other,
}

impl LeaveType {
    pub fn label(&self) -> &'static str {
        match self {
            LeaveType::Sick => "Sick Leave",
            LeaveType::Vacation => "Vacation Leave",
            LeaveType::Personal => "Personal Leave",
            LeaveType::Maternity => "Maternity Leave",
            LeaveType::Paternity => "Paternity Leave",
            LeaveType::Other => "Other Leave",
        }
    }
}

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    /// Approved, rejected and cancelled requests never change again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 3,
    "owner_id": 1,
    "leave_type": "vacation",
    "start_date": "2026-11-02",
    "end_date": "2026-11-06",
    "reason": "Family trip",
    "status": "approved",
    "applied_date": "2026-10-01T09:30:00Z",
    "approved_by": 2,
    "approved_date": "2026-10-02T10:00:00Z",
    "comments": "ok"
}))]
pub struct LeaveRequest {
    pub id: LeaveId,
    pub owner_id: UserId,
    pub leave_type: LeaveType,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    #[schema(format = "date-time", value_type = String)]
    pub applied_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(format = "date-time", value_type = Option<String>)]
    pub approved_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl LeaveRequest {
    /// Inclusive number of calendar days covered by the request.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// Descriptive fields of a leave request as submitted by its owner.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LeaveDraft {
    #[schema(example = "vacation")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-11-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-11-06", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: String,
}

/// A validated leave request that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLeaveRequest {
    pub owner_id: UserId,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub applied_date: DateTime<Utc>,
}

impl NewLeaveRequest {
    pub fn with_id(self, id: LeaveId) -> LeaveRequest {
        LeaveRequest {
            id,
            owner_id: self.owner_id,
            leave_type: self.leave_type,
            start_date: self.start_date,
            end_date: self.end_date,
            reason: self.reason,
            status: self.status,
            applied_date: self.applied_date,
            approved_by: None,
            approved_date: None,
            comments: None,
        }
    }
}

/// Partial update of a stored leave request. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeavePatch {
    pub leave_type: Option<LeaveType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub status: Option<LeaveStatus>,
    pub approved_by: Option<UserId>,
    pub approved_date: Option<DateTime<Utc>>,
    pub comments: Option<String>,
}

impl LeavePatch {
    /// Columns written when a request leaves PENDING.
    pub fn transition(next: &LeaveRequest) -> Self {
        Self {
            status: Some(next.status),
            approved_by: next.approved_by,
            approved_date: next.approved_date,
            comments: next.comments.clone(),
            ..Self::default()
        }
    }

    /// Columns written when the owner revises a pending request.
    pub fn revision(next: &LeaveRequest) -> Self {
        Self {
            leave_type: Some(next.leave_type),
            start_date: Some(next.start_date),
            end_date: Some(next.end_date),
            reason: Some(next.reason.clone()),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, leave: &mut LeaveRequest) {
        if let Some(v) = self.leave_type {
            leave.leave_type = v;
        }
        if let Some(v) = self.start_date {
            leave.start_date = v;
        }
        if let Some(v) = self.end_date {
            leave.end_date = v;
        }
        if let Some(v) = &self.reason {
            leave.reason = v.clone();
        }
        if let Some(v) = self.status {
            leave.status = v;
        }
        if let Some(v) = self.approved_by {
            leave.approved_by = Some(v);
        }
        if let Some(v) = self.approved_date {
            leave.approved_date = Some(v);
        }
        if let Some(v) = &self.comments {
            leave.comments = Some(v.clone());
        }
    }
}

/// List filter for leave requests. `owner_id` is forced for non-managers.
#[derive(Debug, Clone, Default)]
pub struct LeaveFilter {
    pub owner_id: Option<UserId>,
    pub status: Option<LeaveStatus>,
    pub leave_type: Option<LeaveType>,
    pub search: Option<String>,
}

impl LeaveFilter {
    pub fn matches(&self, leave: &LeaveRequest) -> bool {
        self.owner_id.is_none_or(|id| leave.owner_id == id)
            && self.status.is_none_or(|s| leave.status == s)
            && self.leave_type.is_none_or(|t| leave.leave_type == t)
            && self.search.as_deref().is_none_or(|term| {
                leave
                    .reason
                    .to_lowercase()
                    .contains(&term.to_lowercase())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_are_inclusive() {
        let leave = NewLeaveRequest {
            owner_id: 1,
            leave_type: LeaveType::Sick,
            start_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            reason: "flu".into(),
            status: LeaveStatus::Pending,
            applied_date: Utc::now(),
        }
        .with_id(1);
        assert_eq!(leave.days(), 1);
    }

    #[test]
    fn only_pending_is_open() {
        assert!(!LeaveStatus::Pending.is_terminal());
        assert!(LeaveStatus::Approved.is_terminal());
        assert!(LeaveStatus::Rejected.is_terminal());
        assert!(LeaveStatus::Cancelled.is_terminal());
    }

    #[test]
    fn filter_search_is_case_insensitive() {
        let leave = NewLeaveRequest {
            owner_id: 7,
            leave_type: LeaveType::Vacation,
            start_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 11, 4).unwrap(),
            reason: "Beach Holiday".into(),
            status: LeaveStatus::Pending,
            applied_date: Utc::now(),
        }
        .with_id(9);

        let filter = LeaveFilter {
            search: Some("holiday".into()),
            ..LeaveFilter::default()
        };
        assert!(filter.matches(&leave));

        let other_owner = LeaveFilter {
            owner_id: Some(8),
            ..LeaveFilter::default()
        };
        assert!(!other_owner.matches(&leave));
    }
}
