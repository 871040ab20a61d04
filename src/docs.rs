use crate::api::announcement::AnnouncementQuery;
use crate::api::dashboard::DashboardSummary;
use crate::api::document::{DocumentQuery, DocumentView};
use crate::api::leave_request::{
    DecisionReq, LeaveListResponse, LeaveQuery, LeaveTypeOption, LeaveView,
};
use crate::api::navigation::{NavigationQuery, NavigationResponse};
use crate::api::user::MeResponse;
use crate::model::announcement::{
    Announcement, AnnouncementInput, AnnouncementKind, Priority, TargetAudience,
};
use crate::model::document::{Document, DocumentPatch, NewDocument};
use crate::model::leave_request::{LeaveDraft, LeaveRequest, LeaveStatus, LeaveType};
use crate::model::role::Role;
use crate::model::user::{Actor, UserProfile};
use crate::models::{LoginReqDto, RegisterReq, TokenPair};
use crate::policy::lifecycle::LeaveAction;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Employee Portal API",
        version = "1.0.0",
        description = r#"
## Employee Portal

Authorization and lifecycle rules for an internal employee portal.

### 🔹 Key Features
- **Leave Management**
  - Apply for leave, edit pending requests, approve, reject or cancel them
- **Documents**
  - Public company documents for everybody, private ones for managers
- **Announcements**
  - Notices and events addressed to all staff, employees or managers
- **Navigation**
  - Ask whether a portal page may be opened, and where to go instead

### 🔐 Security
Protected endpoints use **JWT Bearer authentication** backed by a server-side
session. Managers may decide leave requests and publish restricted content.

### 📦 Response Format
- JSON-based RESTful responses
- Errors are `{"error": "...", "message": "..."}`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::leave_types,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::update_leave,
        crate::api::leave_request::delete_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,

        crate::api::document::list_documents,
        crate::api::document::get_document,
        crate::api::document::upload_document,
        crate::api::document::update_document,
        crate::api::document::delete_document,

        crate::api::announcement::list_announcements,
        crate::api::announcement::get_announcement,
        crate::api::announcement::create_announcement,
        crate::api::announcement::update_announcement,
        crate::api::announcement::delete_announcement,

        crate::api::user::list_users,
        crate::api::user::me,
        crate::api::dashboard::summary,

        crate::api::navigation::check_navigation
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            TokenPair,
            Role,
            Actor,
            UserProfile,
            MeResponse,
            DashboardSummary,
            LeaveType,
            LeaveStatus,
            LeaveAction,
            LeaveRequest,
            LeaveDraft,
            LeaveQuery,
            LeaveListResponse,
            LeaveTypeOption,
            LeaveView,
            DecisionReq,
            Document,
            NewDocument,
            DocumentPatch,
            DocumentView,
            DocumentQuery,
            TargetAudience,
            Priority,
            AnnouncementKind,
            Announcement,
            AnnouncementInput,
            AnnouncementQuery,
            NavigationQuery,
            NavigationResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Registration, sign-in and sessions"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Document", description = "Document library APIs"),
        (name = "Announcement", description = "Announcement APIs"),
        (name = "User", description = "User directory APIs"),
        (name = "Navigation", description = "Route guard APIs"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
