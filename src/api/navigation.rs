use crate::auth::auth::current_identity;
use crate::policy::guard::{GuardDecision, PORTAL_ROUTES, RouteAccessGuard, RouteRule};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct NavigationQuery {
    /// Portal path the client is about to open
    #[schema(example = "/dashboard/employees")]
    pub path: String,
}

#[derive(Serialize, ToSchema)]
pub struct NavigationResponse {
    #[schema(example = "/dashboard/employees")]
    pub path: String,
    pub allowed: bool,
    /// Where to send the client instead, when not allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "/dashboard")]
    pub redirect_to: Option<String>,
}

/// Ask the route guard whether the caller may open a portal page.
///
/// Works with or without a bearer token; paths outside the route table are
/// public.
#[utoipa::path(
    get,
    path = "/api/v1/navigation",
    params(NavigationQuery),
    responses(
        (status = 200, description = "Guard decision", body = NavigationResponse)
    ),
    tag = "Navigation"
)]
pub async fn check_navigation(
    req: HttpRequest,
    guard: web::Data<RouteAccessGuard>,
    query: web::Query<NavigationQuery>,
) -> HttpResponse {
    let identity = current_identity(&req).await;
    let public = RouteRule::public();
    let rule = PORTAL_ROUTES.lookup(&query.path).unwrap_or(&public);

    let decision = guard.evaluate(rule, &identity);
    tracing::debug!(path = %query.path, decision = %decision, "Navigation checked");

    let redirect_to = match decision {
        GuardDecision::Allow => None,
        GuardDecision::RedirectTo(target) => Some(target),
    };
    HttpResponse::Ok().json(NavigationResponse {
        path: query.into_inner().path,
        allowed: redirect_to.is_none(),
        redirect_to,
    })
}

#[cfg(test)]
mod tests {
    use crate::api::testkit::{Portal, request};
    use crate::model::role::Role;
    use actix_web::test;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Answer {
        allowed: bool,
        redirect_to: Option<String>,
    }

    async fn ask(portal: &Portal, token: Option<&str>, path: &str) -> Answer {
        let app = test::init_service(portal.app()).await;
        let req = request(token)
            .uri(&format!("/api/v1/navigation?path={}", path))
            .to_request();
        test::call_and_read_body_json(&app, req).await
    }

    #[actix_web::test]
    async fn anonymous_visitors_are_sent_to_login() {
        let portal = Portal::new();
        let answer = ask(&portal, None, "/dashboard/leave").await;
        assert!(!answer.allowed);
        assert_eq!(answer.redirect_to.as_deref(), Some("/login"));

        let answer = ask(&portal, None, "/about").await;
        assert!(answer.allowed);
    }

    #[actix_web::test]
    async fn employees_are_kept_out_of_manager_pages() {
        let portal = Portal::new();
        let (_, employee) = portal.signed_in("alice", Role::Employee).await;
        let (_, manager) = portal.signed_in("boss", Role::Manager).await;

        let answer = ask(&portal, Some(&employee), "/dashboard/employees").await;
        assert_eq!(answer.redirect_to.as_deref(), Some("/dashboard"));

        let answer = ask(&portal, Some(&manager), "/dashboard/employees").await;
        assert!(answer.allowed);

        let answer = ask(&portal, Some(&employee), "/login").await;
        assert_eq!(answer.redirect_to.as_deref(), Some("/dashboard"));
    }

    #[actix_web::test]
    async fn a_stale_token_counts_as_anonymous() {
        let portal = Portal::new();
        let answer = ask(&portal, Some("not-a-jwt"), "/dashboard").await;
        assert_eq!(answer.redirect_to.as_deref(), Some("/login"));
    }
}
