//! In-memory portal for handler tests.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{
    App, Error,
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    test::TestRequest,
    web::Data,
};
use chrono::Utc;

use crate::auth::jwt::{Subject, generate_token};
use crate::auth::password::hash_password;
use crate::auth::session::{MemorySessionStore, SessionStore};
use crate::config::Config;
use crate::model::role::Role;
use crate::model::user::{NewUser, User};
use crate::models::TokenType;
use crate::policy::guard::RouteAccessGuard;
use crate::routes::{self, Limiters};
use crate::store::Stores;
use crate::utils::username_filter::UsernameIndex;

pub const PASSWORD: &str = "correct horse";

pub struct Portal {
    pub stores: Stores,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Config,
    pub usernames: Arc<UsernameIndex>,
}

impl Portal {
    pub fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "SERVER_ADDR" => Some("127.0.0.1:0".into()),
            "STORE_BACKEND" => Some("memory".into()),
            "JWT_SECRET" => Some("test-secret".into()),
            _ => None,
        })
        .expect("test config");
        Self {
            stores: Stores::memory(),
            sessions: Arc::new(MemorySessionStore::new(Duration::from_secs(600))),
            config,
            usernames: Arc::new(UsernameIndex::new()),
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody + use<>>,
            Error = Error,
            InitError = (),
        > + use<>,
    > {
        let limiters = Limiters::from_config(&self.config).expect("limiters");
        let config = self.config.clone();
        App::new()
            .app_data(Data::new(self.stores.clone()))
            .app_data(Data::new(self.config.clone()))
            .app_data(Data::from(self.sessions.clone()))
            .app_data(Data::from(self.usernames.clone()))
            .app_data(Data::new(RouteAccessGuard::new(
                self.config.login_path.clone(),
                self.config.default_authenticated_path.clone(),
            )))
            .configure(move |cfg| routes::configure(cfg, &config, &limiters))
    }

    /// Store a user directly; the password is always `PASSWORD`.
    pub async fn user(&self, username: &str, role: Role) -> User {
        self.stores
            .users
            .create(
                NewUser {
                    username: username.to_string(),
                    email: format!("{}@company.test", username),
                    password_hash: hash_password(PASSWORD).expect("hash"),
                    first_name: username.to_string(),
                    last_name: "Test".into(),
                    role,
                    department: "Engineering".into(),
                },
                Utc::now(),
            )
            .await
            .expect("create user")
    }

    /// Open a session for `user` and return its access token.
    pub async fn sign_in(&self, user: &User) -> String {
        let sid = format!("sid-{}", user.id);
        self.sessions
            .persist_actor(&sid, user.actor())
            .await
            .expect("persist session");
        let subject = Subject {
            user_id: user.id,
            username: &user.username,
            role: user.role,
            sid: &sid,
        };
        generate_token(&subject, TokenType::Access, &self.config.jwt_secret, 600)
            .expect("token")
            .0
    }

    pub async fn signed_in(&self, username: &str, role: Role) -> (User, String) {
        let user = self.user(username, role).await;
        let token = self.sign_in(&user).await;
        (user, token)
    }
}

/// A request from a fixed peer, so the rate limiters can key it.
pub fn request(token: Option<&str>) -> TestRequest {
    let req = TestRequest::default().peer_addr("127.0.0.1:40000".parse().expect("addr"));
    match token {
        Some(t) => req.insert_header(("Authorization", format!("Bearer {}", t))),
        None => req,
    }
}
