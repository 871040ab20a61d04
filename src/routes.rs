use crate::{
    api::{announcement, dashboard, document, leave_request, navigation, user},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Result, anyhow};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-route rate limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    login: Limiter,
    register: Limiter,
    refresh: Limiter,
    protected: Limiter,
}

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / requests_per_min as u64
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {} requests per minute", requests_per_min))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

impl Limiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            register: build_limiter(config.rate_register_per_min)?,
            refresh: build_limiter(config.rate_refresh_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(limiters.register.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(limiters.protected.clone()) // rate limiting
            // anonymous callers are answered too
            .service(web::resource("/navigation").route(web::get().to(navigation::check_navigation)))
            .service(
                web::scope("")
                    .wrap(from_fn(auth_middleware)) // authentication
                    .service(web::resource("/me").route(web::get().to(user::me)))
                    .service(web::resource("/dashboard").route(web::get().to(dashboard::summary)))
                    .service(web::resource("/user").route(web::get().to(user::list_users)))
                    .service(
                        web::scope("/leave")
                            // /leave
                            .service(
                                web::resource("")
                                    .route(web::get().to(leave_request::leave_list))
                                    .route(web::post().to(leave_request::create_leave)),
                            )
                            // /leave/types
                            .service(
                                web::resource("/types")
                                    .route(web::get().to(leave_request::leave_types)),
                            )
                            // /leave/{id}
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(leave_request::get_leave))
                                    .route(web::put().to(leave_request::update_leave))
                                    .route(web::delete().to(leave_request::delete_leave)),
                            )
                            // /leave/{id}/approve
                            .service(
                                web::resource("/{id}/approve")
                                    .route(web::put().to(leave_request::approve_leave)),
                            )
                            // /leave/{id}/reject
                            .service(
                                web::resource("/{id}/reject")
                                    .route(web::put().to(leave_request::reject_leave)),
                            )
                            // /leave/{id}/cancel
                            .service(
                                web::resource("/{id}/cancel")
                                    .route(web::put().to(leave_request::cancel_leave)),
                            ),
                    )
                    .service(
                        web::scope("/document")
                            .service(
                                web::resource("")
                                    .route(web::get().to(document::list_documents))
                                    .route(web::post().to(document::upload_document)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(document::get_document))
                                    .route(web::put().to(document::update_document))
                                    .route(web::delete().to(document::delete_document)),
                            ),
                    )
                    .service(
                        web::scope("/announcement")
                            .service(
                                web::resource("")
                                    .route(web::get().to(announcement::list_announcements))
                                    .route(web::post().to(announcement::create_announcement)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(announcement::get_announcement))
                                    .route(web::put().to(announcement::update_announcement))
                                    .route(web::delete().to(announcement::delete_announcement)),
                            ),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days), same session id

// API REQUEST
//  └─ Authorization: Bearer access_token
//       └─ session id -> actor (session store)

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new pair while the session lives

// LOGOUT
//  └─ session cleared, both tokens stop working
