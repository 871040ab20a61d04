//! Allow/deny predicates for every resource kind.
//!
//! Each predicate is a pure function of the actor and the resource. The
//! resource is taken as anything convertible to `Option<&T>`, so callers may
//! pass `&doc` directly or forward a lookup result; an absent resource is
//! always denied and callers treat that as "not found".

use crate::model::announcement::{Announcement, TargetAudience};
use crate::model::document::Document;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::role::Role;
use crate::model::user::Actor;
use crate::policy::error::Denial;

pub fn can_view_document<'a>(actor: &Actor, doc: impl Into<Option<&'a Document>>) -> bool {
    doc.into()
        .is_some_and(|d| actor.is_manager() || d.is_public || actor.owns(d.owner_id))
}

pub fn can_edit_document<'a>(actor: &Actor, doc: impl Into<Option<&'a Document>>) -> bool {
    doc.into()
        .is_some_and(|d| actor.is_manager() || actor.owns(d.owner_id))
}

pub fn can_delete_document<'a>(actor: &Actor, doc: impl Into<Option<&'a Document>>) -> bool {
    can_edit_document(actor, doc)
}

pub fn can_view_leave<'a>(actor: &Actor, leave: impl Into<Option<&'a LeaveRequest>>) -> bool {
    leave
        .into()
        .is_some_and(|l| actor.is_manager() || actor.owns(l.owner_id))
}

pub fn can_edit_leave<'a>(actor: &Actor, leave: impl Into<Option<&'a LeaveRequest>>) -> bool {
    leave.into().is_some_and(|l| {
        actor.is_manager() || (actor.owns(l.owner_id) && l.status == LeaveStatus::Pending)
    })
}

pub fn can_delete_leave<'a>(actor: &Actor, leave: impl Into<Option<&'a LeaveRequest>>) -> bool {
    can_edit_leave(actor, leave)
}

pub fn can_approve_or_reject_leave<'a>(
    actor: &Actor,
    leave: impl Into<Option<&'a LeaveRequest>>,
) -> bool {
    leave
        .into()
        .is_some_and(|l| actor.is_manager() && l.status == LeaveStatus::Pending)
}

/// Mirrors the CANCEL transition guard, for offering the action up front.
pub fn can_cancel_leave<'a>(actor: &Actor, leave: impl Into<Option<&'a LeaveRequest>>) -> bool {
    leave.into().is_some_and(|l| {
        l.status == LeaveStatus::Pending && (actor.owns(l.owner_id) || actor.is_manager())
    })
}

/// Gates creating or editing announcements and non-public documents.
pub fn can_create_restricted_content(actor: &Actor) -> bool {
    actor.is_manager()
}

pub fn is_audience_match<'a>(
    actor: &Actor,
    announcement: impl Into<Option<&'a Announcement>>,
) -> bool {
    announcement
        .into()
        .is_some_and(|a| match a.target_audience {
            TargetAudience::All => true,
            TargetAudience::Employees => actor.role == Role::Employee,
            TargetAudience::Managers => actor.role == Role::Manager,
        })
}

/// Listed announcements: active and addressed to the actor.
pub fn can_view_announcement<'a>(
    actor: &Actor,
    announcement: impl Into<Option<&'a Announcement>>,
) -> bool {
    let announcement = announcement.into();
    announcement.is_some_and(|a| a.is_active) && is_audience_match(actor, announcement)
}

/// Turn a predicate result into a typed refusal.
pub fn ensure(allowed: bool, denial: Denial) -> Result<(), Denial> {
    if allowed { Ok(()) } else { Err(denial) }
}
