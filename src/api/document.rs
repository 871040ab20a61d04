use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::document::{Document, DocumentId, DocumentPatch, NewDocument, format_file_size};
use crate::policy::content;
use crate::policy::error::Denial;
use crate::policy::evaluator::{self, ensure};
use crate::store::Stores;
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DocumentQuery {
    /// Case-insensitive match on title, description and tags
    #[schema(example = "handbook")]
    pub search: Option<String>,
    /// Exact tag, ignoring case
    #[schema(example = "policy")]
    pub tag: Option<String>,
}

/// A document with the flags the portal needs to render its actions.
#[derive(Serialize, ToSchema)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    #[schema(example = "1.95 MB")]
    pub size_label: String,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl DocumentView {
    fn new(document: Document, auth: &AuthUser) -> Self {
        Self {
            size_label: format_file_size(document.file_size),
            can_edit: evaluator::can_edit_document(&auth.actor, &document),
            can_delete: evaluator::can_delete_document(&auth.actor, &document),
            document,
        }
    }
}

async fn visible_document(
    stores: &Stores,
    auth: &AuthUser,
    id: DocumentId,
) -> Result<Document, ApiError> {
    match stores.documents.get_by_id(id).await? {
        Some(doc) if evaluator::can_view_document(&auth.actor, &doc) => Ok(doc),
        _ => Err(ApiError::NotFound("document")),
    }
}

/// Documents visible to the caller: public ones, their own, or all for managers.
#[utoipa::path(
    get,
    path = "/api/v1/document",
    params(DocumentQuery),
    responses(
        (status = 200, description = "Visible documents", body = [DocumentView]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn list_documents(
    auth: AuthUser,
    stores: web::Data<Stores>,
    query: web::Query<DocumentQuery>,
) -> Result<HttpResponse, ApiError> {
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let tag = query.tag.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let docs: Vec<DocumentView> = stores
        .documents
        .list(search)
        .await?
        .into_iter()
        .filter(|d| evaluator::can_view_document(&auth.actor, d))
        .filter(|d| tag.is_none_or(|t| d.has_tag(t)))
        .map(|d| DocumentView::new(d, &auth))
        .collect();
    Ok(HttpResponse::Ok().json(docs))
}

#[utoipa::path(
    get,
    path = "/api/v1/document/{document_id}",
    params(("document_id" = u64, Path, description = "ID of the document")),
    responses(
        (status = 200, description = "Document found", body = DocumentView),
        (status = 404, description = "Document not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn get_document(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<DocumentId>,
) -> Result<HttpResponse, ApiError> {
    let doc = visible_document(&stores, &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DocumentView::new(doc, &auth)))
}

#[utoipa::path(
    post,
    path = "/api/v1/document",
    request_body = NewDocument,
    responses(
        (status = 201, description = "Document uploaded", body = DocumentView),
        (status = 400, description = "Title too short"),
        (status = 403, description = "Only managers may upload private documents")
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn upload_document(
    auth: AuthUser,
    stores: web::Data<Stores>,
    payload: web::Json<NewDocument>,
) -> Result<HttpResponse, ApiError> {
    let doc = payload.into_inner();
    content::check_upload(&doc, &auth.actor)?;

    let stored = stores
        .documents
        .create(auth.actor.id, doc, Utc::now())
        .await?;
    tracing::info!(
        document_id = stored.id,
        owner_id = stored.owner_id,
        public = stored.is_public,
        "Document uploaded"
    );
    Ok(HttpResponse::Created().json(DocumentView::new(stored, &auth)))
}

#[utoipa::path(
    put,
    path = "/api/v1/document/{document_id}",
    params(("document_id" = u64, Path, description = "ID of the document")),
    request_body = DocumentPatch,
    responses(
        (status = 200, description = "Document updated", body = DocumentView),
        (status = 400, description = "Title too short"),
        (status = 403, description = "Not the uploader or a manager"),
        (status = 404, description = "Document not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn update_document(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<DocumentId>,
    payload: web::Json<DocumentPatch>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let patch = payload.into_inner();
    let doc = visible_document(&stores, &auth, id).await?;
    content::check_document_edit(&doc, &patch, &auth.actor)?;

    if patch.is_empty() {
        return Ok(HttpResponse::Ok().json(DocumentView::new(doc, &auth)));
    }
    let updated = stores.documents.patch(id, patch).await?;
    tracing::info!(document_id = id, user_id = auth.actor.id, "Document updated");
    Ok(HttpResponse::Ok().json(DocumentView::new(updated, &auth)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/document/{document_id}",
    params(("document_id" = u64, Path, description = "ID of the document")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 403, description = "Not the uploader or a manager"),
        (status = 404, description = "Document not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Document"
)]
pub async fn delete_document(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<DocumentId>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let doc = visible_document(&stores, &auth, id).await?;
    ensure(
        evaluator::can_delete_document(&auth.actor, &doc),
        Denial::OwnerOrManager,
    )?;

    if !stores.documents.delete(id).await? {
        return Err(ApiError::NotFound("document"));
    }
    tracing::info!(document_id = id, user_id = auth.actor.id, "Document deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use crate::api::testkit::{Portal, request};
    use crate::model::role::Role;
    use actix_web::http::{Method, StatusCode};
    use actix_web::test;
    use serde_json::{Value, json};

    fn upload(title: &str, public: bool) -> Value {
        json!({
            "title": title,
            "description": "Quarterly numbers",
            "file_name": "report.pdf",
            "file_size": 2_097_152,
            "file_type": "application/pdf",
            "tags": ["finance"],
            "is_public": public
        })
    }

    #[actix_web::test]
    async fn private_documents_are_visible_to_managers_only() {
        let portal = Portal::new();
        let (_, employee) = portal.signed_in("alice", Role::Employee).await;
        let (_, manager) = portal.signed_in("boss", Role::Manager).await;
        let app = test::init_service(portal.app()).await;

        let req = request(Some(&manager))
            .method(Method::POST)
            .uri("/api/v1/document")
            .set_json(upload("Salary bands", false))
            .to_request();
        let private: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(private["size_label"], "2 MB");

        let req = request(Some(&manager))
            .method(Method::POST)
            .uri("/api/v1/document")
            .set_json(upload("Handbook", true))
            .to_request();
        let public: Value = test::call_and_read_body_json(&app, req).await;

        let req = request(Some(&employee)).uri("/api/v1/document").to_request();
        let listed: Value = test::call_and_read_body_json(&app, req).await;
        let listed = listed.as_array().cloned().unwrap_or_default();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["id"], public["id"]);
        assert_eq!(listed[0]["can_edit"], false);

        let req = request(Some(&employee))
            .uri(&format!("/api/v1/document/{}", private["id"]))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn employees_may_only_upload_public_documents() {
        let portal = Portal::new();
        let (_, employee) = portal.signed_in("alice", Role::Employee).await;
        let app = test::init_service(portal.app()).await;

        let req = request(Some(&employee))
            .method(Method::POST)
            .uri("/api/v1/document")
            .set_json(upload("My notes", false))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );

        let req = request(Some(&employee))
            .method(Method::POST)
            .uri("/api/v1/document")
            .set_json(upload("My notes", true))
            .to_request();
        let doc: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(doc["can_delete"], true);
    }

    #[actix_web::test]
    async fn only_owner_or_manager_edits_public_documents() {
        let portal = Portal::new();
        let (_, alice) = portal.signed_in("alice", Role::Employee).await;
        let (_, bob) = portal.signed_in("bob", Role::Employee).await;
        let app = test::init_service(portal.app()).await;

        let req = request(Some(&alice))
            .method(Method::POST)
            .uri("/api/v1/document")
            .set_json(upload("Lunch menu", true))
            .to_request();
        let doc: Value = test::call_and_read_body_json(&app, req).await;
        let uri = format!("/api/v1/document/{}", doc["id"]);

        let req = request(Some(&bob))
            .method(Method::PUT)
            .uri(&uri)
            .set_json(json!({ "title": "Bob's menu" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );

        let req = request(Some(&bob)).method(Method::DELETE).uri(&uri).to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN
        );

        let req = request(Some(&alice))
            .method(Method::PUT)
            .uri(&uri)
            .set_json(json!({ "title": "Lunch menu v2" }))
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["title"], "Lunch menu v2");
    }

    #[actix_web::test]
    async fn tag_filter_matches_whole_tags() {
        let portal = Portal::new();
        let (_, manager) = portal.signed_in("boss", Role::Manager).await;
        let app = test::init_service(portal.app()).await;

        for (title, tags) in [("Handbook", json!(["Policy", "HR"])), ("Policy drafts", json!(["drafts"]))] {
            let mut doc = upload(title, true);
            doc["tags"] = tags;
            let req = request(Some(&manager))
                .method(Method::POST)
                .uri("/api/v1/document")
                .set_json(doc)
                .to_request();
            assert_eq!(
                test::call_service(&app, req).await.status(),
                StatusCode::CREATED
            );
        }

        let req = request(Some(&manager))
            .uri("/api/v1/document?tag=policy")
            .to_request();
        let tagged: Value = test::call_and_read_body_json(&app, req).await;
        let titles: Vec<&str> = tagged
            .as_array()
            .map(|docs| docs.iter().filter_map(|d| d["title"].as_str()).collect())
            .unwrap_or_default();
        assert_eq!(titles, vec!["Handbook"]);
    }
}
