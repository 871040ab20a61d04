//! Leave request state machine.
//!
//! ```text
//! PENDING --approve--> APPROVED
//!         --reject---> REJECTED
//!         --cancel---> CANCELLED
//! ```
//!
//! Every function here computes a value and returns it; writing the value is
//! left to the store, which re-checks the status it was computed from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::model::leave_request::{LeaveDraft, LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::user::Actor;
use crate::policy::error::{Denial, LifecycleError, ValidationError};
use crate::policy::evaluator;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveAction {
    Approve,
    Reject,
    Cancel,
}

impl LeaveAction {
    /// Status reached from PENDING.
    pub fn target(self) -> LeaveStatus {
        match self {
            LeaveAction::Approve => LeaveStatus::Approved,
            LeaveAction::Reject => LeaveStatus::Rejected,
            LeaveAction::Cancel => LeaveStatus::Cancelled,
        }
    }

    fn requires_comment(self) -> bool {
        matches!(self, LeaveAction::Approve | LeaveAction::Reject)
    }
}

/// Validate a submission and produce the PENDING request to store.
pub fn apply(
    draft: LeaveDraft,
    owner: &Actor,
    now: DateTime<Utc>,
) -> Result<NewLeaveRequest, LifecycleError> {
    let reason = validate_draft(&draft, now)?;

    Ok(NewLeaveRequest {
        owner_id: owner.id,
        leave_type: draft.leave_type,
        start_date: draft.start_date,
        end_date: draft.end_date,
        reason,
        status: LeaveStatus::Pending,
        applied_date: now,
    })
}

/// Compute the value of `leave` after `action` by `actor`.
///
/// State is checked before the guard, and the guard before the comment.
pub fn transition(
    leave: &LeaveRequest,
    action: LeaveAction,
    actor: &Actor,
    comment: Option<&str>,
    now: DateTime<Utc>,
) -> Result<LeaveRequest, LifecycleError> {
    if leave.status != LeaveStatus::Pending {
        return Err(LifecycleError::InvalidTransition {
            from: leave.status,
            action,
        });
    }

    match action {
        LeaveAction::Approve | LeaveAction::Reject => {
            evaluator::ensure(actor.is_manager(), Denial::ManagerOnly)?
        }
        LeaveAction::Cancel => evaluator::ensure(
            actor.owns(leave.owner_id) || actor.is_manager(),
            Denial::OwnerOrManager,
        )?,
    }

    let comment = comment.map(str::trim).filter(|c| !c.is_empty());
    if action.requires_comment() && comment.is_none() {
        return Err(ValidationError::MissingComment(action).into());
    }

    let mut next = leave.clone();
    next.status = action.target();
    next.approved_by = Some(actor.id);
    next.approved_date = Some(now);
    next.comments = comment.map(str::to_string);
    Ok(next)
}

/// Replace the descriptive fields of a pending request.
pub fn revise(
    leave: &LeaveRequest,
    draft: LeaveDraft,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<LeaveRequest, LifecycleError> {
    evaluator::ensure(
        evaluator::can_edit_leave(actor, leave),
        Denial::OwnerOrManager,
    )?;
    if leave.status.is_terminal() {
        return Err(LifecycleError::Closed {
            id: leave.id,
            status: leave.status,
        });
    }

    let reason = validate_draft(&draft, now)?;

    let mut next = leave.clone();
    next.leave_type = draft.leave_type;
    next.start_date = draft.start_date;
    next.end_date = draft.end_date;
    next.reason = reason;
    Ok(next)
}

fn validate_draft(draft: &LeaveDraft, now: DateTime<Utc>) -> Result<String, ValidationError> {
    if draft.start_date > draft.end_date {
        return Err(ValidationError::InvertedDateRange {
            start: draft.start_date,
            end: draft.end_date,
        });
    }

    let today = now.date_naive();
    if draft.start_date < today {
        return Err(ValidationError::StartInPast {
            start: draft.start_date,
            today,
        });
    }

    let reason = draft.reason.trim();
    if reason.is_empty() {
        return Err(ValidationError::EmptyReason);
    }
    Ok(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_request::LeaveType;
    use crate::model::role::Role;
    use chrono::{NaiveDate, TimeZone};

    const E: Actor = Actor {
        id: 1,
        role: Role::Employee,
        active: true,
    };
    const OTHER: Actor = Actor {
        id: 4,
        role: Role::Employee,
        active: true,
    };
    const M: Actor = Actor {
        id: 2,
        role: Role::Manager,
        active: true,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(start: NaiveDate, end: NaiveDate, reason: &str) -> LeaveDraft {
        LeaveDraft {
            leave_type: LeaveType::Vacation,
            start_date: start,
            end_date: end,
            reason: reason.to_string(),
        }
    }

    fn leave(id: u64, status: LeaveStatus) -> LeaveRequest {
        let mut leave = apply(draft(date(2026, 11, 2), date(2026, 11, 6), "Family trip"), &E, now())
            .unwrap()
            .with_id(id);
        leave.status = status;
        leave
    }

    #[test]
    fn apply_yields_pending_request() {
        let new = apply(draft(date(2026, 10, 16), date(2026, 10, 17), "  dentist "), &E, now())
            .unwrap();
        assert_eq!(new.status, LeaveStatus::Pending);
        assert_eq!(new.owner_id, E.id);
        assert_eq!(new.applied_date, now());
        assert_eq!(new.reason, "dentist");
    }

    #[test]
    fn apply_rejects_inverted_range() {
        let err = apply(draft(date(2026, 11, 6), date(2026, 11, 2), "trip"), &E, now()).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Validation(ValidationError::InvertedDateRange { .. })
        ));
    }

    #[test]
    fn apply_rejects_start_in_the_past() {
        let err = apply(draft(date(2026, 10, 15), date(2026, 10, 20), "trip"), &E, now()).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::Validation(ValidationError::StartInPast {
                start: date(2026, 10, 15),
                today: date(2026, 10, 16),
            })
        );
    }

    #[test]
    fn apply_rejects_blank_reason() {
        let err = apply(draft(date(2026, 11, 2), date(2026, 11, 3), "   "), &E, now()).unwrap_err();
        assert_eq!(err, LifecycleError::Validation(ValidationError::EmptyReason));
    }

    #[test]
    fn manager_approves_with_comment() {
        let pending = leave(3, LeaveStatus::Pending);
        let next = transition(&pending, LeaveAction::Approve, &M, Some("ok"), now()).unwrap();

        assert_eq!(next.status, LeaveStatus::Approved);
        assert_eq!(next.approved_by, Some(M.id));
        assert_eq!(next.approved_date, Some(now()));
        assert_eq!(next.comments.as_deref(), Some("ok"));
        assert_eq!(pending.status, LeaveStatus::Pending);
    }

    #[test]
    fn manager_rejects_with_comment() {
        let pending = leave(3, LeaveStatus::Pending);
        let next = transition(&pending, LeaveAction::Reject, &M, Some("busy week"), now()).unwrap();
        assert_eq!(next.status, LeaveStatus::Rejected);
        assert_eq!(next.comments.as_deref(), Some("busy week"));
    }

    #[test]
    fn employee_cannot_approve_own_leave() {
        let pending = leave(3, LeaveStatus::Pending);
        for comment in [Some("ok"), None] {
            let err = transition(&pending, LeaveAction::Approve, &E, comment, now()).unwrap_err();
            assert_eq!(err, LifecycleError::Authorization(Denial::ManagerOnly));
        }
    }

    #[test]
    fn approve_and_reject_need_a_comment() {
        let pending = leave(3, LeaveStatus::Pending);
        for action in [LeaveAction::Approve, LeaveAction::Reject] {
            for comment in [None, Some(""), Some("   ")] {
                let err = transition(&pending, action, &M, comment, now()).unwrap_err();
                assert_eq!(
                    err,
                    LifecycleError::Validation(ValidationError::MissingComment(action))
                );
            }
        }
    }

    #[test]
    fn managers_may_approve_their_own_leave() {
        let mut own = leave(5, LeaveStatus::Pending);
        own.owner_id = M.id;
        let next = transition(&own, LeaveAction::Approve, &M, Some("self"), now()).unwrap();
        assert_eq!(next.status, LeaveStatus::Approved);
    }

    #[test]
    fn owner_cancels_once() {
        let pending = leave(4, LeaveStatus::Pending);
        let cancelled = transition(&pending, LeaveAction::Cancel, &E, None, now()).unwrap();
        assert_eq!(cancelled.status, LeaveStatus::Cancelled);
        assert_eq!(cancelled.approved_by, Some(E.id));
        assert_eq!(cancelled.comments, None);

        let err = transition(&cancelled, LeaveAction::Cancel, &E, None, now()).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                from: LeaveStatus::Cancelled,
                action: LeaveAction::Cancel,
            }
        );
    }

    #[test]
    fn cancel_keeps_an_optional_comment() {
        let pending = leave(4, LeaveStatus::Pending);
        let cancelled =
            transition(&pending, LeaveAction::Cancel, &M, Some("plans changed"), now()).unwrap();
        assert_eq!(cancelled.comments.as_deref(), Some("plans changed"));
    }

    #[test]
    fn strangers_cannot_cancel() {
        let pending = leave(4, LeaveStatus::Pending);
        let err = transition(&pending, LeaveAction::Cancel, &OTHER, None, now()).unwrap_err();
        assert_eq!(err, LifecycleError::Authorization(Denial::OwnerOrManager));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        for status in [
            LeaveStatus::Approved,
            LeaveStatus::Rejected,
            LeaveStatus::Cancelled,
        ] {
            let closed = leave(7, status);
            for action in [LeaveAction::Approve, LeaveAction::Reject, LeaveAction::Cancel] {
                for actor in [E, M, OTHER] {
                    let err = transition(&closed, action, &actor, Some("x"), now()).unwrap_err();
                    assert_eq!(
                        err,
                        LifecycleError::InvalidTransition {
                            from: status,
                            action,
                        }
                    );
                }
            }
        }
    }

    #[test]
    fn revise_updates_pending_fields() {
        let pending = leave(8, LeaveStatus::Pending);
        let next = revise(
            &pending,
            draft(date(2026, 12, 1), date(2026, 12, 3), "moved"),
            &E,
            now(),
        )
        .unwrap();
        assert_eq!(next.start_date, date(2026, 12, 1));
        assert_eq!(next.reason, "moved");
        assert_eq!(next.status, LeaveStatus::Pending);
    }

    #[test]
    fn revise_is_refused_for_strangers_and_closed_requests() {
        let pending = leave(8, LeaveStatus::Pending);
        let err = revise(
            &pending,
            draft(date(2026, 12, 1), date(2026, 12, 3), "moved"),
            &OTHER,
            now(),
        )
        .unwrap_err();
        assert_eq!(err, LifecycleError::Authorization(Denial::OwnerOrManager));

        let approved = leave(8, LeaveStatus::Approved);
        let err = revise(
            &approved,
            draft(date(2026, 12, 1), date(2026, 12, 3), "moved"),
            &M,
            now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LifecycleError::Closed {
                id: 8,
                status: LeaveStatus::Approved,
            }
        );
    }
}
