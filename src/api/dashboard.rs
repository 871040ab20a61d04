use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::announcement::Announcement;
use crate::model::document::Document;
use crate::model::leave_request::{LeaveFilter, LeaveRequest, LeaveStatus};
use crate::policy::evaluator;
use crate::store::Stores;
use actix_web::{HttpResponse, web};
use serde::Serialize;
use utoipa::ToSchema;

const RECENT: usize = 5;

/// Landing page counters and the latest items behind them.
#[derive(Serialize, ToSchema)]
pub struct DashboardSummary {
    /// Caller's own requests still awaiting a decision.
    #[schema(example = 1)]
    pub pending_leaves: usize,
    #[schema(example = 12)]
    pub documents: usize,
    #[schema(example = 4)]
    pub active_announcements: usize,
    pub recent_leaves: Vec<LeaveRequest>,
    pub recent_documents: Vec<Document>,
    pub recent_announcements: Vec<Announcement>,
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Counters for the caller", body = DashboardSummary),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn summary(auth: AuthUser, stores: web::Data<Stores>) -> Result<HttpResponse, ApiError> {
    let actor = &auth.actor;

    let own = LeaveFilter {
        owner_id: Some(actor.id),
        ..LeaveFilter::default()
    };
    let leaves = stores.leaves.list(&own).await?;
    let pending_leaves = leaves
        .iter()
        .filter(|l| l.status == LeaveStatus::Pending)
        .count();

    let mut documents: Vec<Document> = stores
        .documents
        .list(None)
        .await?
        .into_iter()
        .filter(|d| evaluator::can_view_document(actor, d))
        .collect();
    documents.sort_by(|a, b| b.uploaded_date.cmp(&a.uploaded_date).then(b.id.cmp(&a.id)));

    let mut announcements: Vec<Announcement> = stores
        .announcements
        .list()
        .await?
        .into_iter()
        .filter(|a| evaluator::can_view_announcement(actor, a))
        .collect();
    announcements.sort_by(|a, b| b.created_date.cmp(&a.created_date).then(b.id.cmp(&a.id)));

    Ok(HttpResponse::Ok().json(DashboardSummary {
        pending_leaves,
        documents: documents.len(),
        active_announcements: announcements.len(),
        recent_leaves: leaves.into_iter().take(RECENT).collect(),
        recent_documents: documents.into_iter().take(RECENT).collect(),
        recent_announcements: announcements.into_iter().take(RECENT).collect(),
    }))
}
