use actix_web::middleware::Next;
use actix_web::{
    Error, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
};

use crate::auth::auth::{authenticate, remember};

/// Rejects requests without a live session; otherwise exposes `AuthUser` to
/// the handlers behind it.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    match authenticate(req.request()).await {
        Ok(user) => {
            tracing::debug!(user_id = user.actor.id, role = %user.actor.role, "Authenticated");
            remember(req.request(), user);
            next.call(req).await
        }
        Err(e) => {
            let resp = e.error_response();
            Ok(req.into_response(resp))
        }
    }
}
