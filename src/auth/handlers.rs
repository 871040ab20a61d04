use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::{Subject, bearer, generate_token, verify_token},
        password::{hash_password, verify_password},
        session::SessionStore,
    },
    config::Config,
    error::ApiError,
    model::user::{Actor, NewUser, UserProfile},
    models::{LoginReqDto, RegisterReq, TokenPair, TokenType},
    policy::{error::Denial, identity::IdentityContext},
    store::Stores,
    utils::username_filter::UsernameIndex,
};

// auth end points

fn issue_pair(actor: &Actor, username: &str, sid: &str, config: &Config) -> Result<TokenPair, ApiError> {
    let subject = Subject {
        user_id: actor.id,
        username,
        role: actor.role,
        sid,
    };
    let sign = |token_type, ttl| {
        generate_token(&subject, token_type, &config.jwt_secret, ttl)
            .map(|(token, _)| token)
            .map_err(|e| {
                error!(error = %e, "Failed to sign token");
                ApiError::Internal
            })
    };
    Ok(TokenPair {
        access_token: sign(TokenType::Access, config.access_token_ttl)?,
        refresh_token: sign(TokenType::Refresh, config.refresh_token_ttl)?,
    })
}

fn header_token(req: &HttpRequest) -> Option<&str> {
    bearer(
        req.headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok()),
    )
}

/// User registration handler
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = UserProfile),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(user, stores, usernames), fields(username = %user.username))]
pub async fn register(
    user: web::Json<RegisterReq>,
    stores: web::Data<Stores>,
    usernames: web::Data<UsernameIndex>,
) -> Result<HttpResponse, ApiError> {
    let user = user.into_inner();
    let username = user.username.trim().to_lowercase();

    if username.is_empty() || user.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password must not be empty".into(),
        ));
    }
    if user.email.trim().is_empty() {
        return Err(ApiError::BadRequest("Email must not be empty".into()));
    }

    if !usernames.is_available(&username, stores.users.as_ref()).await {
        info!("Username already taken");
        return Err(ApiError::Conflict("Username already taken".into()));
    }

    let password_hash = hash_password(&user.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ApiError::Internal
    })?;

    let created = stores
        .users
        .create(
            NewUser {
                username,
                email: user.email.trim().to_string(),
                password_hash,
                first_name: user.first_name.trim().to_string(),
                last_name: user.last_name.trim().to_string(),
                role: user.role,
                department: user.department.trim().to_string(),
            },
            Utc::now(),
        )
        .await?;

    // keep the filter in step with the store
    usernames.insert(&created.username);
    info!(user_id = created.id, role = %created.role, "User registered");

    Ok(HttpResponse::Created().json(UserProfile::from(&created)))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = TokenPair),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is inactive")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(stores, sessions, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    stores: web::Data<Stores>,
    sessions: web::Data<dyn SessionStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(ApiError::BadRequest("Username or password required".into()));
    }

    debug!("Fetching user from store");
    let username = user.username.trim().to_lowercase();
    let stored = match stores.users.find_by_username(&username).await? {
        Some(found) => found,
        None => {
            info!("Invalid credentials: user not found");
            return Err(ApiError::Unauthorized("Invalid credentials"));
        }
    };

    debug!("Verifying password");
    if let Err(e) = verify_password(&user.password, &stored.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }
    if !stored.is_active {
        info!(user_id = stored.id, "Login refused: inactive account");
        return Err(Denial::Inactive.into());
    }

    let actor = stored.actor();

    let sid = Uuid::new_v4().to_string();
    debug!(user_id = actor.id, sid = %sid, "Persisting session");
    sessions.persist_actor(&sid, actor).await?;

    let pair = issue_pair(&actor, &stored.username, &sid, &config)?;
    info!(user_id = actor.id, role = %actor.role, "Login successful");

    Ok(HttpResponse::Ok().json(pair))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair for the same session", body = TokenPair),
        (status = 401, description = "Missing, invalid or signed-out refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    sessions: web::Data<dyn SessionStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let token = header_token(&req).ok_or(ApiError::Unauthorized("No token"))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token"))?;
    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::Unauthorized("Refresh token required"));
    }

    // the session, not the token, is the source of truth for the role
    let identity = IdentityContext::restore(sessions.get_ref(), &claims.sid).await;
    let actor = match identity.current() {
        Some(actor) if actor.id == claims.user_id => actor,
        _ => return Err(ApiError::Unauthorized("Session expired or signed out")),
    };

    // extend the session alongside the new refresh token
    sessions.persist_actor(&claims.sid, actor).await?;
    let pair = issue_pair(&actor, &claims.sub, &claims.sid, &config)?;
    debug!(user_id = actor.id, "Tokens refreshed");

    Ok(HttpResponse::Ok().json(pair))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Session cleared, or there was none"),
        (status = 500, description = "Session could not be cleared")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    sessions: web::Data<dyn SessionStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let claims = match header_token(&req).map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) => c,
        _ => return Ok(HttpResponse::NoContent().finish()),
    };

    // either token of the pair ends the session (idempotent)
    if let Err(e) = sessions.clear_actor(&claims.sid).await {
        error!(error = %e, user_id = claims.user_id, "Failed to clear session");
        return Err(ApiError::Internal);
    }
    info!(user_id = claims.user_id, "Logged out");

    Ok(HttpResponse::NoContent().finish())
}
