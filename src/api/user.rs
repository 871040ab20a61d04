use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::user::{Actor, UserProfile};
use crate::store::Stores;
use actix_web::{HttpResponse, web};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub user: UserProfile,
    /// Identity the current session was established with.
    pub session: Actor,
}

/// Staff directory, managers only.
#[utoipa::path(
    get,
    path = "/api/v1/user",
    responses(
        (status = 200, description = "All portal users", body = [UserProfile]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Managers only")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn list_users(
    auth: AuthUser,
    stores: web::Data<Stores>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;
    let users: Vec<UserProfile> = stores
        .users
        .list()
        .await?
        .iter()
        .map(UserProfile::from)
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn me(auth: AuthUser, stores: web::Data<Stores>) -> Result<HttpResponse, ApiError> {
    let user = stores
        .users
        .get_by_id(auth.actor.id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(HttpResponse::Ok().json(MeResponse {
        user: UserProfile::from(&user),
        session: auth.actor,
    }))
}
