use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod policy;
mod routes;
mod store;
mod utils;

use auth::session::{MemorySessionStore, MySqlSessionStore, SessionStore};
use config::{Config, StoreBackend};
use db::init_db;
use policy::guard::RouteAccessGuard;
use routes::Limiters;
use store::Stores;
use utils::username_filter::UsernameIndex;

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Employee Portal API"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(backend = ?config.store_backend, "Server starting...");

    let session_ttl = Duration::from_secs(config.refresh_token_ttl as u64);
    let (stores, sessions): (Stores, Arc<dyn SessionStore>) = match config.store_backend {
        StoreBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set when STORE_BACKEND is mysql")?;
            let pool = init_db(url).await?;
            (
                Stores::mysql(pool.clone()),
                Arc::new(MySqlSessionStore::new(pool, session_ttl)),
            )
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            (Stores::memory(), Arc::new(MemorySessionStore::new(session_ttl)))
        }
    };

    let usernames = Arc::new(UsernameIndex::new());
    let limiters = Limiters::from_config(&config)?;
    let guard = RouteAccessGuard::new(
        config.login_path.clone(),
        config.default_authenticated_path.clone(),
    );

    let users_for_warmup = stores.users.clone();
    let usernames_for_warmup = usernames.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = usernames_for_warmup
            .warmup(users_for_warmup.as_ref(), 100)
            .await
        {
            tracing::error!(error = %e, "Failed to warmup username filter");
        }
    });

    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        let config_for_routes = config.clone();
        let limiters = limiters.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(stores.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::from(sessions.clone()))
            .app_data(Data::from(usernames.clone()))
            .app_data(Data::new(guard.clone()))
            .service(index)
            // Configure auth + protected routes with rate limiting
            .configure(move |cfg| routes::configure(cfg, &config_for_routes, &limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("failed to bind {}", server_addr))?
    .run()
    .await?;

    Ok(())
}
