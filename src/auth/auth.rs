use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

use crate::auth::jwt::{bearer, verify_token};
use crate::auth::session::SessionStore;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::user::Actor;
use crate::models::TokenType;
use crate::policy::error::Denial;
use crate::policy::evaluator;
use crate::policy::identity::IdentityContext;

/// The caller of a protected endpoint, placed in request extensions by
/// `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub actor: Actor,
    pub username: String,
    /// Session id shared by the access and refresh token of one login.
    pub sid: String,
}

impl AuthUser {
    pub fn require_manager(&self) -> Result<(), ApiError> {
        evaluator::ensure(
            evaluator::can_create_restricted_content(&self.actor),
            Denial::ManagerOnly,
        )?;
        Ok(())
    }

    pub fn identity(&self) -> IdentityContext {
        IdentityContext::with_actor(self.actor)
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or(ApiError::Unauthorized("Missing or invalid token")),
        )
    }
}

/// Resolve the bearer token of `req` to a live session.
pub async fn authenticate(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or(ApiError::Internal)?
        .clone();
    let sessions = req
        .app_data::<Data<dyn SessionStore>>()
        .ok_or(ApiError::Internal)?
        .clone();

    let header = req
        .headers()
        .get("Authorization")
        .map(|h| h.to_str().map_err(|_| ApiError::Unauthorized("Invalid Authorization header encoding")))
        .transpose()?;
    let token = bearer(header).ok_or(ApiError::Unauthorized(
        "Authorization header must start with Bearer",
    ))?;

    let claims = verify_token(token, &config.jwt_secret).map_err(|e| {
        tracing::debug!(error = %e, "Rejected token");
        ApiError::Unauthorized("Invalid or expired token")
    })?;
    if claims.token_type != TokenType::Access {
        return Err(ApiError::Unauthorized("Access token required"));
    }

    let identity = IdentityContext::restore(sessions.get_ref(), &claims.sid).await;
    match identity.current() {
        Some(actor) if actor.id == claims.user_id => Ok(AuthUser {
            actor,
            username: claims.sub,
            sid: claims.sid,
        }),
        _ => Err(ApiError::Unauthorized("Session expired or signed out")),
    }
}

/// Like `authenticate`, but an anonymous caller is not an error.
pub async fn current_identity(req: &HttpRequest) -> IdentityContext {
    if req.headers().get("Authorization").is_none() {
        return IdentityContext::new();
    }
    match authenticate(req).await {
        Ok(user) => user.identity(),
        Err(_) => IdentityContext::new(),
    }
}

pub(crate) fn remember(req: &HttpRequest, user: AuthUser) {
    req.extensions_mut().insert(user);
}
