use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::leave_request::{
    LeaveDraft, LeaveFilter, LeaveId, LeavePatch, LeaveRequest, LeaveStatus, LeaveType,
};
use crate::policy::error::Denial;
use crate::policy::evaluator::{self, ensure};
use crate::policy::lifecycle::{self, LeaveAction};
use crate::store::Stores;
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "data": [
        {
            "id": 1,
            "owner_id": 3,
            "leave_type": "vacation",
            "start_date": "2026-11-02",
            "end_date": "2026-11-06",
            "reason": "Family trip",
            "status": "pending",
            "applied_date": "2026-10-01T09:30:00Z"
        }
    ],
    "page": 1,
    "per_page": 10,
    "total": 1
}))]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveQuery {
    #[schema(example = 3)]
    /// Filter by owner. Ignored for employees, who only see their own.
    pub owner_id: Option<u64>,
    #[schema(example = "pending")]
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    #[schema(example = "sick")]
    /// Filter by leave type
    pub leave_type: Option<LeaveType>,
    /// Case-insensitive match on the reason
    pub search: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>, // 1-based
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>, // items per page
}

/// Body of approve, reject and cancel.
#[derive(Deserialize, ToSchema, Default)]
pub struct DecisionReq {
    #[schema(example = "Enjoy your time off")]
    pub comments: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveTypeOption {
    #[schema(example = "vacation")]
    pub value: LeaveType,
    #[schema(example = "Vacation Leave")]
    pub label: &'static str,
}

/// A leave request with the actions the caller may take on it.
#[derive(Serialize, ToSchema)]
pub struct LeaveView {
    #[serde(flatten)]
    pub leave: LeaveRequest,
    #[schema(example = 5)]
    pub days: i64,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_cancel: bool,
    pub can_decide: bool,
}

impl LeaveView {
    fn new(leave: LeaveRequest, auth: &AuthUser) -> Self {
        let actor = &auth.actor;
        Self {
            days: leave.days(),
            can_edit: evaluator::can_edit_leave(actor, &leave),
            can_delete: evaluator::can_delete_leave(actor, &leave),
            can_cancel: evaluator::can_cancel_leave(actor, &leave),
            can_decide: evaluator::can_approve_or_reject_leave(actor, &leave),
            leave,
        }
    }
}

/// Fetch a request the caller may see; anything else is reported missing.
async fn visible_leave(
    stores: &Stores,
    auth: &AuthUser,
    leave_id: LeaveId,
) -> Result<LeaveRequest, ApiError> {
    let leave = stores.leaves.get_by_id(leave_id).await?;
    match leave {
        Some(leave) if evaluator::can_view_leave(&auth.actor, &leave) => Ok(leave),
        _ => Err(ApiError::NotFound("leave request")),
    }
}

/* =========================
Create leave request
========================= */
/// Swagger doc for create_leave endpoint
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body(
        content = LeaveDraft,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Invalid dates or empty reason"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    stores: web::Data<Stores>,
    payload: web::Json<LeaveDraft>,
) -> Result<HttpResponse, ApiError> {
    let new_leave = lifecycle::apply(payload.into_inner(), &auth.actor, Utc::now())?;
    let created = stores.leaves.create(new_leave).await?;

    tracing::info!(
        leave_id = created.id,
        owner_id = created.owner_id,
        days = created.days(),
        "Leave request submitted"
    );
    Ok(HttpResponse::Created().json(created))
}

/// Replace dates, type and reason of a pending request.
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to edit")
    ),
    request_body = LeaveDraft,
    responses(
        (status = 200, description = "Leave request updated", body = LeaveRequest),
        (status = 400, description = "Invalid dates or empty reason"),
        (status = 403, description = "Not the owner or a manager"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request is closed or changed concurrently")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn update_leave(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<LeaveId>,
    payload: web::Json<LeaveDraft>,
) -> Result<HttpResponse, ApiError> {
    let leave_id = path.into_inner();
    let leave = visible_leave(&stores, &auth, leave_id).await?;

    let next = lifecycle::revise(&leave, payload.into_inner(), &auth.actor, Utc::now())?;
    let updated = stores
        .leaves
        .patch(leave_id, leave.status, LeavePatch::revision(&next))
        .await?;

    tracing::info!(leave_id, user_id = auth.actor.id, "Leave request revised");
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to delete")
    ),
    responses(
        (status = 204, description = "Leave request deleted"),
        (status = 403, description = "Not the owner or a manager"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request changed concurrently")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<LeaveId>,
) -> Result<HttpResponse, ApiError> {
    let leave_id = path.into_inner();
    let leave = visible_leave(&stores, &auth, leave_id).await?;
    ensure(
        evaluator::can_delete_leave(&auth.actor, &leave),
        Denial::OwnerOrManager,
    )?;

    if !stores.leaves.delete(leave_id, leave.status).await? {
        return Err(ApiError::NotFound("leave request"));
    }
    tracing::info!(leave_id, user_id = auth.actor.id, "Leave request deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// Run `action` against the stored request, guarded by the status it was read with.
async fn decide(
    auth: AuthUser,
    stores: web::Data<Stores>,
    leave_id: LeaveId,
    action: LeaveAction,
    body: Option<web::Json<DecisionReq>>,
) -> Result<HttpResponse, ApiError> {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let leave = visible_leave(&stores, &auth, leave_id).await?;

    let next = lifecycle::transition(
        &leave,
        action,
        &auth.actor,
        body.comments.as_deref(),
        Utc::now(),
    )?;
    let stored = stores
        .leaves
        .patch(leave_id, leave.status, LeavePatch::transition(&next))
        .await?;

    tracing::info!(
        leave_id,
        user_id = auth.actor.id,
        action = %action,
        status = %stored.status,
        "Leave request decided"
    );
    Ok(HttpResponse::Ok().json(stored))
}

/* =========================
Approve leave (manager)
========================= */
/// Swagger doc for approve_leave endpoint
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    request_body = DecisionReq,
    responses(
        (status = 200, description = "Leave approved", body = LeaveRequest),
        (status = 400, description = "A comment is required"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Managers only"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request is not pending")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<LeaveId>,
    body: Option<web::Json<DecisionReq>>,
) -> Result<HttpResponse, ApiError> {
    decide(auth, stores, path.into_inner(), LeaveAction::Approve, body).await
}

/* =========================
Reject leave (manager)
========================= */
/// Swagger doc for reject_leave endpoint
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body = DecisionReq,
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 400, description = "A comment is required"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Managers only"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request is not pending")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<LeaveId>,
    body: Option<web::Json<DecisionReq>>,
) -> Result<HttpResponse, ApiError> {
    decide(auth, stores, path.into_inner(), LeaveAction::Reject, body).await
}

#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to cancel")
    ),
    request_body = DecisionReq,
    responses(
        (status = 200, description = "Leave cancelled", body = LeaveRequest),
        (status = 403, description = "Not the owner or a manager"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request is not pending")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<LeaveId>,
    body: Option<web::Json<DecisionReq>>,
) -> Result<HttpResponse, ApiError> {
    decide(auth, stores, path.into_inner(), LeaveAction::Cancel, body).await
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveView),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "error": "not_found",
            "message": "leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<LeaveId>,
) -> Result<HttpResponse, ApiError> {
    let leave = visible_leave(&stores, &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(LeaveView::new(leave, &auth)))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveQuery),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    stores: web::Data<Stores>,
    query: web::Query<LeaveQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();

    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let page = query.page.unwrap_or(1).clamp(1, u64::from(u32::MAX));
    let offset = usize::try_from(page.saturating_sub(1).saturating_mul(per_page))
        .unwrap_or(usize::MAX);

    // -------------------------
    // Filter
    // -------------------------
    let owner_id = if auth.actor.is_manager() {
        query.owner_id
    } else {
        Some(auth.actor.id)
    };
    let filter = LeaveFilter {
        owner_id,
        status: query.status,
        leave_type: query.leave_type,
        search: query.search.filter(|s| !s.trim().is_empty()),
    };

    let mut leaves: Vec<LeaveRequest> = stores
        .leaves
        .list(&filter)
        .await?
        .into_iter()
        .filter(|l| evaluator::can_view_leave(&auth.actor, l))
        .collect();
    leaves.sort_by(|a, b| b.applied_date.cmp(&a.applied_date).then(b.id.cmp(&a.id)));

    let total = leaves.len() as i64;
    let data = leaves
        .into_iter()
        .skip(offset)
        .take(per_page as usize)
        .collect();

    // -------------------------
    // Response
    // -------------------------
    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/leave/types",
    responses(
        (status = 200, description = "Selectable leave types", body = [LeaveTypeOption])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_types(_auth: AuthUser) -> HttpResponse {
    let options: Vec<LeaveTypeOption> = LeaveType::iter()
        .map(|value| LeaveTypeOption {
            value,
            label: value.label(),
        })
        .collect();
    HttpResponse::Ok().json(options)
}
