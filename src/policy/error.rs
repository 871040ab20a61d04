use chrono::NaiveDate;
use derive_more::Display;
use thiserror::Error;

use crate::model::leave_request::{LeaveId, LeaveStatus};
use crate::policy::lifecycle::LeaveAction;

/// Malformed input. Reported to the caller, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("start date {start} cannot be after end date {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },

    #[error("start date {start} is in the past (today is {today})")]
    StartInPast { start: NaiveDate, today: NaiveDate },

    #[error("reason must not be empty")]
    EmptyReason,

    #[error("a comment is required to {0} a leave request")]
    MissingComment(LeaveAction),

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("event location must not be empty")]
    MissingLocation,

    #[error("event must end after it starts")]
    InvertedEventTime,
}

/// Why a guarded operation was refused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum Denial {
    #[display(fmt = "manager role required")]
    ManagerOnly,
    #[display(fmt = "only the owner or a manager may do this")]
    OwnerOrManager,
    #[display(fmt = "account is inactive")]
    Inactive,
}

/// Every failure the lifecycle engine can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("cannot {action} a leave request that is {from}")]
    InvalidTransition {
        from: LeaveStatus,
        action: LeaveAction,
    },

    #[error("leave request {id} is {status} and can no longer be edited")]
    Closed { id: LeaveId, status: LeaveStatus },

    #[error("not authorized: {0}")]
    Authorization(Denial),

    #[error("leave request {id} changed since it was read: expected {expected}, found {found}")]
    Conflict {
        id: LeaveId,
        expected: LeaveStatus,
        found: LeaveStatus,
    },
}

impl From<Denial> for LifecycleError {
    fn from(denial: Denial) -> Self {
        LifecycleError::Authorization(denial)
    }
}
