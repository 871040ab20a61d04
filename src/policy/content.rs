//! Checks for manager-authored content: announcements and private documents.

use chrono::{DateTime, Utc};

use crate::model::announcement::{AnnouncementInput, AnnouncementKind, NewAnnouncement};
use crate::model::document::{Document, DocumentPatch, NewDocument};
use crate::model::user::Actor;
use crate::policy::error::{Denial, LifecycleError, ValidationError};
use crate::policy::evaluator;

const MIN_TITLE_LEN: usize = 3;
const MIN_CONTENT_LEN: usize = 10;

/// Validate an announcement by its shape and stamp it with its author.
pub fn prepare_announcement(
    input: AnnouncementInput,
    author: &Actor,
    now: DateTime<Utc>,
) -> Result<NewAnnouncement, LifecycleError> {
    evaluator::ensure(
        evaluator::can_create_restricted_content(author),
        Denial::ManagerOnly,
    )?;

    let title = input.title.trim();
    if title.chars().count() < MIN_TITLE_LEN {
        return Err(ValidationError::TooShort {
            field: "title",
            min: MIN_TITLE_LEN,
        }
        .into());
    }
    let content = input.content.trim();
    if content.chars().count() < MIN_CONTENT_LEN {
        return Err(ValidationError::TooShort {
            field: "content",
            min: MIN_CONTENT_LEN,
        }
        .into());
    }

    let kind = match input.kind {
        AnnouncementKind::Plain => AnnouncementKind::Plain,
        AnnouncementKind::Event {
            event_date,
            start_time,
            end_time,
            location,
        } => {
            let location = location.trim();
            if location.is_empty() {
                return Err(ValidationError::MissingLocation.into());
            }
            if end_time <= start_time {
                return Err(ValidationError::InvertedEventTime.into());
            }
            AnnouncementKind::Event {
                event_date,
                start_time,
                end_time,
                location: location.to_string(),
            }
        }
    };

    Ok(NewAnnouncement {
        owner_id: author.id,
        target_audience: input.target_audience,
        is_active: input.is_active,
        title: title.to_string(),
        content: content.to_string(),
        priority: input.priority,
        kind,
        created_date: now,
    })
}

/// Anyone may upload public documents; private ones are restricted content.
pub fn check_upload(doc: &NewDocument, uploader: &Actor) -> Result<(), LifecycleError> {
    if !doc.is_public {
        evaluator::ensure(
            evaluator::can_create_restricted_content(uploader),
            Denial::ManagerOnly,
        )?;
    }
    if doc.title.trim().chars().count() < MIN_TITLE_LEN {
        return Err(ValidationError::TooShort {
            field: "title",
            min: MIN_TITLE_LEN,
        }
        .into());
    }
    Ok(())
}

/// Edits need `can_edit_document`; making a document private is restricted.
pub fn check_document_edit(
    doc: &Document,
    patch: &DocumentPatch,
    editor: &Actor,
) -> Result<(), LifecycleError> {
    evaluator::ensure(
        evaluator::can_edit_document(editor, doc),
        Denial::OwnerOrManager,
    )?;
    if doc.is_public && patch.is_public == Some(false) {
        evaluator::ensure(
            evaluator::can_create_restricted_content(editor),
            Denial::ManagerOnly,
        )?;
    }
    if let Some(title) = &patch.title {
        if title.trim().chars().count() < MIN_TITLE_LEN {
            return Err(ValidationError::TooShort {
                field: "title",
                min: MIN_TITLE_LEN,
            }
            .into());
        }
    }
    Ok(())
}
