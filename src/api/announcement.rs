use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::announcement::{Announcement, AnnouncementId, AnnouncementInput, Priority};
use crate::policy::content;
use crate::policy::evaluator;
use crate::store::Stores;
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AnnouncementQuery {
    /// Managers only: include inactive announcements and every audience.
    #[serde(default)]
    pub all: bool,
    /// Case-insensitive match on title and content
    pub search: Option<String>,
    pub priority: Option<Priority>,
    /// Only events dated after today, soonest first
    #[serde(default)]
    pub upcoming: bool,
}

/// Managers see everything they manage; others only what is addressed to them.
fn visible(auth: &AuthUser, announcement: &Announcement, manage: bool) -> bool {
    (manage && evaluator::can_create_restricted_content(&auth.actor))
        || evaluator::can_view_announcement(&auth.actor, announcement)
}

#[utoipa::path(
    get,
    path = "/api/v1/announcement",
    params(AnnouncementQuery),
    responses(
        (status = 200, description = "Announcements for the caller, newest first", body = [Announcement]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Announcement"
)]
pub async fn list_announcements(
    auth: AuthUser,
    stores: web::Data<Stores>,
    query: web::Query<AnnouncementQuery>,
) -> Result<HttpResponse, ApiError> {
    let today = Utc::now().date_naive();
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let mut items: Vec<Announcement> = stores
        .announcements
        .list()
        .await?
        .into_iter()
        .filter(|a| visible(&auth, a, query.all))
        .filter(|a| query.priority.is_none_or(|p| a.priority == p))
        .filter(|a| search.is_none_or(|term| a.matches_search(term)))
        .filter(|a| !query.upcoming || a.is_upcoming(today))
        .collect();
    if query.upcoming {
        items.sort_by_key(|a| (a.kind.event_date(), a.id));
    } else {
        items.sort_by(|a, b| b.created_date.cmp(&a.created_date).then(b.id.cmp(&a.id)));
    }
    Ok(HttpResponse::Ok().json(items))
}

#[utoipa::path(
    get,
    path = "/api/v1/announcement/{announcement_id}",
    params(("announcement_id" = u64, Path, description = "ID of the announcement")),
    responses(
        (status = 200, description = "Announcement found", body = Announcement),
        (status = 404, description = "Announcement not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Announcement"
)]
pub async fn get_announcement(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<AnnouncementId>,
) -> Result<HttpResponse, ApiError> {
    match stores.announcements.get_by_id(path.into_inner()).await? {
        Some(a) if visible(&auth, &a, true) => Ok(HttpResponse::Ok().json(a)),
        _ => Err(ApiError::NotFound("announcement")),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/announcement",
    request_body = AnnouncementInput,
    responses(
        (status = 201, description = "Announcement published", body = Announcement),
        (status = 400, description = "Title, content or event details invalid"),
        (status = 403, description = "Managers only")
    ),
    security(("bearer_auth" = [])),
    tag = "Announcement"
)]
pub async fn create_announcement(
    auth: AuthUser,
    stores: web::Data<Stores>,
    payload: web::Json<AnnouncementInput>,
) -> Result<HttpResponse, ApiError> {
    let new = content::prepare_announcement(payload.into_inner(), &auth.actor, Utc::now())?;
    let stored = stores.announcements.create(new).await?;
    tracing::info!(
        announcement_id = stored.id,
        audience = %stored.target_audience,
        event = stored.kind.is_event(),
        event_date = ?stored.kind.event_date(),
        "Announcement published"
    );
    Ok(HttpResponse::Created().json(stored))
}

#[utoipa::path(
    put,
    path = "/api/v1/announcement/{announcement_id}",
    params(("announcement_id" = u64, Path, description = "ID of the announcement")),
    request_body = AnnouncementInput,
    responses(
        (status = 200, description = "Announcement replaced", body = Announcement),
        (status = 400, description = "Title, content or event details invalid"),
        (status = 403, description = "Managers only"),
        (status = 404, description = "Announcement not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Announcement"
)]
pub async fn update_announcement(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<AnnouncementId>,
    payload: web::Json<AnnouncementInput>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let new = content::prepare_announcement(payload.into_inner(), &auth.actor, Utc::now())?;
    let stored = stores.announcements.update(id, new).await?;
    tracing::info!(announcement_id = id, user_id = auth.actor.id, "Announcement updated");
    Ok(HttpResponse::Ok().json(stored))
}

#[utoipa::path(
    delete,
    path = "/api/v1/announcement/{announcement_id}",
    params(("announcement_id" = u64, Path, description = "ID of the announcement")),
    responses(
        (status = 204, description = "Announcement deleted"),
        (status = 403, description = "Managers only"),
        (status = 404, description = "Announcement not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Announcement"
)]
pub async fn delete_announcement(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<AnnouncementId>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;
    let id = path.into_inner();
    if !stores.announcements.delete(id).await? {
        return Err(ApiError::NotFound("announcement"));
    }
    tracing::info!(announcement_id = id, user_id = auth.actor.id, "Announcement deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use crate::api::testkit::{Portal, request};
    use crate::model::role::Role;
    use actix_web::http::{Method, StatusCode};
    use actix_web::test;
    use chrono::{Duration, NaiveDate, Utc};
    use serde_json::{Value, json};

    fn event(date: NaiveDate) -> Value {
        json!({
            "type": "event",
            "event_date": date,
            "start_time": "10:00:00",
            "end_time": "11:00:00",
            "location": "Main hall"
        })
    }

    fn notice(title: &str, audience: &str) -> Value {
        json!({
            "title": title,
            "content": "Please read this carefully before Friday.",
            "target_audience": audience,
            "kind": { "type": "plain" }
        })
    }

    #[actix_web::test]
    async fn audiences_partition_the_feed() {
        let portal = Portal::new();
        let (_, employee) = portal.signed_in("alice", Role::Employee).await;
        let (_, manager) = portal.signed_in("boss", Role::Manager).await;
        let app = test::init_service(portal.app()).await;

        for (title, audience) in [("Town hall", "all"), ("Budget review", "managers")] {
            let req = request(Some(&manager))
                .method(Method::POST)
                .uri("/api/v1/announcement")
                .set_json(notice(title, audience))
                .to_request();
            assert_eq!(
                test::call_service(&app, req).await.status(),
                StatusCode::CREATED
            );
        }

        let req = request(Some(&employee))
            .uri("/api/v1/announcement")
            .to_request();
        let feed: Value = test::call_and_read_body_json(&app, req).await;
        let titles: Vec<&str> = feed
            .as_array()
            .map(|items| items.iter().filter_map(|a| a["title"].as_str()).collect())
            .unwrap_or_default();
        assert_eq!(titles, vec!["Town hall"]);

        let req = request(Some(&manager))
            .uri("/api/v1/announcement")
            .to_request();
        let feed: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(feed.as_array().map(Vec::len), Some(2));
    }

    #[actix_web::test]
    async fn employees_cannot_publish() {
        let portal = Portal::new();
        let (_, employee) = portal.signed_in("alice", Role::Employee).await;
        let app = test::init_service(portal.app()).await;

        let req = request(Some(&employee))
            .method(Method::POST)
            .uri("/api/v1/announcement")
            .set_json(notice("Party", "all"))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );
    }

    #[actix_web::test]
    async fn events_need_a_location_and_ordered_times() {
        let portal = Portal::new();
        let (_, manager) = portal.signed_in("boss", Role::Manager).await;
        let app = test::init_service(portal.app()).await;

        let mut event = notice("Team building", "all");
        event["kind"] = json!({
            "type": "event",
            "event_date": "2026-11-15",
            "start_time": "16:00:00",
            "end_time": "14:00:00",
            "location": "Park"
        });
        let req = request(Some(&manager))
            .method(Method::POST)
            .uri("/api/v1/announcement")
            .set_json(event.clone())
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        event["kind"]["end_time"] = json!("18:00:00");
        let req = request(Some(&manager))
            .method(Method::POST)
            .uri("/api/v1/announcement")
            .set_json(event)
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created["kind"]["location"], "Park");
    }

    #[actix_web::test]
    async fn feed_filters_by_search_priority_and_upcoming_events() {
        let portal = Portal::new();
        let (_, manager) = portal.signed_in("boss", Role::Manager).await;
        let app = test::init_service(portal.app()).await;

        let today = Utc::now().date_naive();
        let mut urgent = notice("Server maintenance", "all");
        urgent["priority"] = json!("high");
        let mut past = notice("Summer picnic", "all");
        past["kind"] = event(today - Duration::days(30));
        let mut soon = notice("Quarterly town hall", "all");
        soon["kind"] = event(today + Duration::days(7));

        for body in [urgent, past, soon] {
            let req = request(Some(&manager))
                .method(Method::POST)
                .uri("/api/v1/announcement")
                .set_json(body)
                .to_request();
            assert_eq!(
                test::call_service(&app, req).await.status(),
                StatusCode::CREATED
            );
        }

        for (query, expected) in [
            ("priority=high", vec!["Server maintenance"]),
            ("search=TOWN", vec!["Quarterly town hall"]),
            ("upcoming=true", vec!["Quarterly town hall"]),
        ] {
            let req = request(Some(&manager))
                .uri(&format!("/api/v1/announcement?{}", query))
                .to_request();
            let feed: Value = test::call_and_read_body_json(&app, req).await;
            let titles: Vec<&str> = feed
                .as_array()
                .map(|items| items.iter().filter_map(|a| a["title"].as_str()).collect())
                .unwrap_or_default();
            assert_eq!(titles, expected, "{}", query);
        }
    }
}
